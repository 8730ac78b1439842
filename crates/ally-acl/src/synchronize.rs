//! Synchronization of the configured groups and rights with the database.
//!
//! The configuration is parsed into a tree of repository contexts, reachable
//! from the solicit context. Every repository node naming a group or a
//! right is collected breadth first and the database is made to hold
//! exactly the configured entities.

use crate::error::SyncError;
use crate::service::{EntityService, Group, GroupService, Right, RightService, RightType, RightTypeService};
use ally_design::prelude::*;
use ally_design::support::list_bfs;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The solicit argument context.
pub mod solicit {
    use super::*;

    /// The context name.
    pub const CONTEXT: &str = "solicit";

    /// The root of the configuration repository tree.
    pub const REPOSITORY: Attribute<SharedContext> = Attribute::new("repository");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::argument(CONTEXT)
    }
}

/// The nested repository context, one per configuration node.
pub mod repository {
    use super::*;
    use crate::service::RightId;

    /// The context name.
    pub const CONTEXT: &str = "Repository";

    /// The child nodes.
    pub const CHILDREN: Attribute<Vec<SharedContext>> = Attribute::new("children");
    /// The configuration line of the node.
    pub const LINE_NUMBER: Attribute<u32> = Attribute::new("line_number");
    /// The configuration column of the node.
    pub const COL_NUMBER: Attribute<u32> = Attribute::new("col_number");
    /// The configuration file.
    pub const URI: Attribute<String> = Attribute::new("uri");
    /// The group configured by the node.
    pub const GROUP_NAME: Attribute<String> = Attribute::new("group_name");
    /// The right configured by the node.
    pub const RIGHT_NAME: Attribute<String> = Attribute::new("right_name");
    /// The description of the configured right.
    pub const DESCRIPTION: Attribute<String> = Attribute::new("description");
    /// The database id of the configured right.
    pub const RIGHT_ID: Attribute<RightId> = Attribute::new("right_id");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::nested(CONTEXT)
    }

    /// Returns the declaration of a processor walking located nodes.
    #[must_use]
    pub fn located() -> ContextSpec {
        spec()
            .requires(&CHILDREN)
            .requires(&LINE_NUMBER)
            .requires(&COL_NUMBER)
            .requires(&URI)
    }
}

fn location(node: &Context) -> (String, u32, u32) {
    let uri = node.get(&repository::URI).ok().flatten().cloned();
    let line = node.get(&repository::LINE_NUMBER).ok().flatten().copied();
    let column = node.get(&repository::COL_NUMBER).ok().flatten().copied();
    (
        uri.unwrap_or_else(|| "<unknown>".to_string()),
        line.unwrap_or_default(),
        column.unwrap_or_default(),
    )
}

/// Makes the database hold exactly the configured entities.
///
/// `entities_config` maps the configured names to their repository nodes,
/// `entities_db` maps the stored names to their ids. Missing entities are
/// created with `create` and inserted; a failed insert is logged with the
/// configuration location and skipped. Stored entities that are not
/// configured are deleted.
///
/// Returns the ids of the configured entities that are in the database.
///
/// # Errors
///
/// Returns an error if an entity cannot be created or deleted.
pub async fn sync_with_database<S, F>(
    service: &S,
    entities_config: IndexMap<String, SharedContext>,
    mut entities_db: IndexMap<String, S::Id>,
    create: F,
) -> Result<IndexMap<String, S::Id>, SyncError>
where
    S: EntityService + ?Sized,
    F: Fn(&str, &Context) -> Result<S::Entity, SyncError>,
{
    let mut ids = IndexMap::with_capacity(entities_config.len());
    let mut inserted = 0;
    for (name, node) in entities_config {
        if let Some(id) = entities_db.shift_remove(&name) {
            ids.insert(name, id);
            continue;
        }

        let (entity, (uri, line, column)) = {
            let node = node.read();
            (create(&name, &node)?, location(&node))
        };
        let described = entity.to_string();
        match service.insert(entity).await {
            Ok(id) => {
                inserted += 1;
                ids.insert(name, id);
            }
            Err(err) => {
                warn!(entity = %described, %uri, line, column, error = %err, "Cannot add to the database");
            }
        }
    }

    let deleted = entities_db.len();
    for (_, id) in entities_db {
        service.delete(id).await?;
    }
    debug!(inserted, deleted, kept = ids.len() - inserted, "Synchronized with the database");
    Ok(ids)
}

fn collect_named(
    root: &SharedContext,
    name: &Attribute<String>,
) -> Result<(Vec<SharedContext>, IndexMap<String, SharedContext>), ProcessError> {
    let nodes = list_bfs(root, &repository::CHILDREN, Some(name.name()))?;
    let mut named = IndexMap::with_capacity(nodes.len());
    for node in &nodes {
        let key = node.read().require(name)?.clone();
        named.insert(key, Arc::clone(node));
    }
    Ok((nodes, named))
}

/// Synchronizes the configured groups.
///
/// Groups named in `anonymous_groups` are inserted as anonymous.
pub struct SynchronizeGroupsHandler {
    service: Arc<dyn GroupService>,
    anonymous_groups: HashSet<String>,
}

impl SynchronizeGroupsHandler {
    /// Creates the processor.
    pub fn new<I, S>(service: Arc<dyn GroupService>, anonymous_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service,
            anonymous_groups: anonymous_groups.into_iter().map(Into::into).collect(),
        }
    }
}

impl Processor for SynchronizeGroupsHandler {
    fn name(&self) -> &str {
        "synchronize_groups"
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![
            solicit::spec().requires(&solicit::REPOSITORY),
            repository::located().requires(&repository::GROUP_NAME),
        ]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let root = chain.arg(solicit::CONTEXT)?.require(&solicit::REPOSITORY)?.clone();
            let (_, groups) = collect_named(&root, &repository::GROUP_NAME)?;

            let stored = self.service.get_all().await?;
            let groups_db = stored.into_iter().map(|name| (name.clone(), name)).collect();

            let ids = sync_with_database(&*self.service, groups, groups_db, |name, _| {
                Ok(Group {
                    name: name.to_string(),
                    is_anonymous: self.anonymous_groups.contains(name),
                })
            })
            .await?;
            info!(groups = ids.len(), "Groups synchronized");
            Ok(())
        })
    }
}

/// Synchronizes the configured rights of one right type.
///
/// The type is created when missing, and every right node gets the id of
/// its right.
pub struct SynchronizeRightsHandler {
    type_name: String,
    right_service: Arc<dyn RightService>,
    right_type_service: Arc<dyn RightTypeService>,
}

impl SynchronizeRightsHandler {
    /// Creates the processor for rights of `type_name`.
    pub fn new(
        type_name: impl Into<String>,
        right_service: Arc<dyn RightService>,
        right_type_service: Arc<dyn RightTypeService>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            right_service,
            right_type_service,
        }
    }

    async fn ensure_right_type(&self) -> Result<(), SyncError> {
        if self.right_type_service.get_by_id(&self.type_name).await?.is_none() {
            let right_type = RightType {
                name: self.type_name.clone(),
                description: None,
            };
            self.right_type_service.insert(right_type).await?;
            info!(right_type = %self.type_name, "Right type created");
        }
        Ok(())
    }
}

impl Processor for SynchronizeRightsHandler {
    fn name(&self) -> &str {
        "synchronize_rights"
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![
            solicit::spec().requires(&solicit::REPOSITORY),
            repository::located()
                .requires(&repository::RIGHT_NAME)
                .optional(&repository::DESCRIPTION)
                .defines(&repository::RIGHT_ID),
        ]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let root = chain.arg(solicit::CONTEXT)?.require(&solicit::REPOSITORY)?.clone();
            self.ensure_right_type().await?;

            let (nodes, rights) = collect_named(&root, &repository::RIGHT_NAME)?;
            let rights_db = self
                .right_service
                .get_all(&self.type_name)
                .await?
                .into_iter()
                .filter_map(|right| right.id.map(|id| (right.name, id)))
                .collect();

            let ids = sync_with_database(&*self.right_service, rights, rights_db, |name, node| {
                Ok(Right {
                    id: None,
                    name: name.to_string(),
                    right_type: self.type_name.clone(),
                    description: node.get(&repository::DESCRIPTION)?.cloned(),
                })
            })
            .await?;

            for node in nodes {
                let mut node = node.write();
                let name = node.require(&repository::RIGHT_NAME)?.clone();
                if let Some(id) = ids.get(&name) {
                    node.set(&repository::RIGHT_ID, *id)?;
                }
            }
            info!(right_type = %self.type_name, rights = ids.len(), "Rights synchronized");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{MemoryGroups, MemoryRightTypes, MemoryRights};

    fn processing(processor: impl Processor + 'static) -> Processing {
        let mut assembly = Assembly::new("synchronize");
        assembly.add(processor).unwrap();
        Processing::builder(&assembly)
            .source(solicit::spec().defines(&solicit::REPOSITORY))
            .source(
                repository::spec()
                    .defines(&repository::CHILDREN)
                    .defines(&repository::LINE_NUMBER)
                    .defines(&repository::COL_NUMBER)
                    .defines(&repository::URI)
                    .defines(&repository::GROUP_NAME)
                    .defines(&repository::RIGHT_NAME)
                    .defines(&repository::DESCRIPTION),
            )
            .build()
            .unwrap()
    }

    fn node(
        processing: &Processing,
        line: u32,
        named: Option<(&Attribute<String>, &str)>,
        children: Vec<SharedContext>,
    ) -> SharedContext {
        let mut context = processing.new_context(repository::CONTEXT).unwrap();
        context.set(&repository::URI, "acl.xml".to_string()).unwrap();
        context.set(&repository::LINE_NUMBER, line).unwrap();
        context.set(&repository::COL_NUMBER, 4).unwrap();
        context.set(&repository::CHILDREN, children).unwrap();
        if let Some((attribute, name)) = named {
            context.set(attribute, name.to_string()).unwrap();
        }
        share(context)
    }

    async fn run(processing: &Processing, root: SharedContext) {
        let mut context = processing.new_context(solicit::CONTEXT).unwrap();
        context.set(&solicit::REPOSITORY, root).unwrap();
        processing
            .execute(Contexts::new().with(context))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sync_inserts_keeps_and_deletes() {
        let groups = MemoryGroups::with(&["Editors", "Obsolete"]);
        let mut config = IndexMap::new();
        let probe = processing(SynchronizeGroupsHandler::new(
            Arc::new(MemoryGroups::default()),
            Vec::<String>::new(),
        ));
        for (line, name) in [(1, "Editors"), (2, "Anonymous")] {
            config.insert(
                name.to_string(),
                node(&probe, line, Some((&repository::GROUP_NAME, name)), Vec::new()),
            );
        }
        let db = groups.names().into_iter().map(|name| (name.clone(), name)).collect();

        let ids = sync_with_database(&groups, config, db, |name, _| {
            Ok(Group {
                name: name.to_string(),
                is_anonymous: false,
            })
        })
        .await
        .unwrap();

        assert_eq!(ids.keys().collect::<Vec<_>>(), ["Editors", "Anonymous"]);
        assert_eq!(groups.names(), ["Editors", "Anonymous"]);
    }

    #[tokio::test]
    async fn test_failed_insert_is_skipped() {
        let mut groups = MemoryGroups::default();
        groups.failing.insert("Broken".to_string());
        let groups = Arc::new(groups);
        let processing = processing(SynchronizeGroupsHandler::new(
            groups.clone(),
            Vec::<String>::new(),
        ));
        let root = node(
            &processing,
            1,
            None,
            vec![
                node(&processing, 2, Some((&repository::GROUP_NAME, "Broken")), Vec::new()),
                node(&processing, 3, Some((&repository::GROUP_NAME, "Working")), Vec::new()),
            ],
        );

        run(&processing, root).await;
        assert_eq!(groups.names(), ["Working"]);
    }

    #[tokio::test]
    async fn test_synchronize_groups_marks_anonymous() {
        let groups = Arc::new(MemoryGroups::with(&["Stale"]));
        let processing = processing(SynchronizeGroupsHandler::new(groups.clone(), ["Anonymous"]));
        let editors = node(&processing, 3, Some((&repository::GROUP_NAME, "Editors")), Vec::new());
        let root = node(
            &processing,
            1,
            None,
            vec![
                node(&processing, 2, Some((&repository::GROUP_NAME, "Anonymous")), Vec::new()),
                node(&processing, 2, None, vec![editors]),
            ],
        );

        run(&processing, root).await;

        let stored = groups.groups.lock();
        assert_eq!(stored.keys().collect::<Vec<_>>(), ["Anonymous", "Editors"]);
        assert!(stored["Anonymous"].is_anonymous);
        assert!(!stored["Editors"].is_anonymous);
    }

    #[tokio::test]
    async fn test_synchronize_rights_defines_ids() {
        let rights = Arc::new(MemoryRights::default());
        let kept = rights.add("Article view", "GUI Access");
        rights.add("Removed", "GUI Access");
        rights.add("Other type", "API Access");
        let types = Arc::new(MemoryRightTypes::default());
        let processing = processing(SynchronizeRightsHandler::new(
            "GUI Access",
            rights.clone(),
            types.clone(),
        ));

        let view = node(&processing, 2, Some((&repository::RIGHT_NAME, "Article view")), Vec::new());
        let edit = node(&processing, 3, Some((&repository::RIGHT_NAME, "Article edit")), Vec::new());
        edit.write()
            .set(&repository::DESCRIPTION, "Edit articles".to_string())
            .unwrap();
        let root = node(&processing, 1, None, vec![view.clone(), edit.clone()]);

        run(&processing, root).await;

        assert!(types.types.lock().contains_key("GUI Access"));
        assert_eq!(view.read().get(&repository::RIGHT_ID).unwrap(), Some(&kept));
        let created = rights.find("Article edit").unwrap();
        assert_eq!(created.description.as_deref(), Some("Edit articles"));
        assert_eq!(edit.read().get(&repository::RIGHT_ID).unwrap(), created.id.as_ref());
        assert!(rights.find("Removed").is_none());
        assert!(rights.find("Other type").is_some());
    }
}
