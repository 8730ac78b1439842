//! Resolves the target of every ACL filter.
//!
//! A filter restricts access by the value of one property. The property is
//! found in the path elements of the invokers the filter is declared on,
//! and all of them must agree on it.

use ally_core::api::{Element, TypeProperty};
use ally_core::contexts::{invoker, register};
use ally_design::prelude::*;
use ally_design::ContextError;
use std::sync::Arc;
use tracing::error;

/// The nested ACL filter context.
pub mod acl_filter {
    use super::*;
    use indexmap::IndexMap;

    /// The context name.
    pub const CONTEXT: &str = "ACLFilter";

    /// The ACL filters by name, held by the register context.
    pub const FILTERS: Attribute<IndexMap<String, SharedContext>> = Attribute::new("filters");

    /// The invokers the filter is declared on.
    pub const INVOKERS: Attribute<Vec<SharedContext>> = Attribute::new("invokers");
    /// The property the filter checks.
    pub const TARGET_PROPERTY: Attribute<Arc<TypeProperty>> = Attribute::new("target_property");
    /// The path elements holding the target property.
    pub const TARGETS: Attribute<Vec<Element>> = Attribute::new("targets");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::nested(CONTEXT)
    }
}

enum Target {
    Found(Arc<TypeProperty>, Vec<Element>),
    Incompatible,
    Missing,
}

fn find_target(invokers: &[SharedContext]) -> Result<Target, ContextError> {
    let mut property: Option<Arc<TypeProperty>> = None;
    let mut targets = Vec::new();
    for shared in invokers {
        let context = shared.read();
        for element in context.require(&invoker::PATH)? {
            let Some(candidate) = element.as_property() else {
                continue;
            };
            match &property {
                None => property = Some(Arc::clone(candidate)),
                Some(current) if current != candidate => return Ok(Target::Incompatible),
                Some(_) => {}
            }
            targets.push(element.clone());
        }
    }
    Ok(match property {
        Some(property) => Target::Found(property, targets),
        None => Target::Missing,
    })
}

fn locations(invokers: &[SharedContext]) -> Result<Vec<String>, ContextError> {
    invokers
        .iter()
        .map(|shared| Ok(shared.read().require(&invoker::LOCATION)?.clone()))
        .collect()
}

/// Defines the target property of the registered ACL filters.
///
/// The invokers of a filter without a usable target are reported together
/// in one abort, by location, so the assembler can drop them and retry.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterTargetHandler;

impl FilterTargetHandler {
    /// Creates the processor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Processor for FilterTargetHandler {
    fn name(&self) -> &str {
        "filter_target"
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![
            register::spec().requires(&acl_filter::FILTERS),
            invoker::spec()
                .requires(&invoker::PATH)
                .requires(&invoker::LOCATION),
            acl_filter::spec()
                .requires(&acl_filter::INVOKERS)
                .defines(&acl_filter::TARGET_PROPERTY)
                .defines(&acl_filter::TARGETS),
        ]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let Some(filters) = chain.arg(register::CONTEXT)?.get(&acl_filter::FILTERS)? else {
                return Ok(());
            };

            let mut aborted = Vec::new();
            for (name, filter) in filters {
                let invokers = filter.read().require(&acl_filter::INVOKERS)?.clone();
                let problem = match find_target(&invokers)? {
                    Target::Found(property, targets) => {
                        let mut context = filter.write();
                        context.set(&acl_filter::TARGET_PROPERTY, property)?;
                        context.set(&acl_filter::TARGETS, targets)?;
                        continue;
                    }
                    Target::Incompatible => "they have incompatible inputs",
                    Target::Missing => "they have no target property",
                };

                let at = locations(&invokers)?;
                error!(filter = %name, at = %at.join(", "), "Cannot use filters because {problem}");
                aborted.extend(at);
            }

            match Abort::with_reasons(aborted) {
                Some(abort) => Err(abort.into()),
                None => Ok(()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ally_core::api::{ApiType, TypeModel};
    use ally_design::ChainError;
    use indexmap::IndexMap;

    fn processing() -> Processing {
        let mut assembly = Assembly::new("assembler");
        assembly.add(FilterTargetHandler::new()).unwrap();
        Processing::builder(&assembly)
            .source(register::spec().defines(&acl_filter::FILTERS))
            .source(invoker::registered())
            .source(acl_filter::spec().defines(&acl_filter::INVOKERS))
            .build()
            .unwrap()
    }

    fn property(model: &Arc<TypeModel>, name: &str) -> Element {
        Element::property(Arc::new(TypeProperty::of_model(model, name, ApiType::Integer)))
    }

    fn invoker(processing: &Processing, location: &str, path: Vec<Element>) -> SharedContext {
        let mut context = processing.new_context(invoker::CONTEXT).unwrap();
        context.set(&invoker::LOCATION, location.to_string()).unwrap();
        context.set(&invoker::PATH, path).unwrap();
        share(context)
    }

    fn filter(processing: &Processing, invokers: Vec<SharedContext>) -> SharedContext {
        let mut context = processing.new_context(acl_filter::CONTEXT).unwrap();
        context.set(&acl_filter::INVOKERS, invokers).unwrap();
        share(context)
    }

    async fn run(
        processing: &Processing,
        filters: Vec<(&str, SharedContext)>,
    ) -> Result<Contexts, ChainError> {
        let filters: IndexMap<String, SharedContext> = filters
            .into_iter()
            .map(|(name, filter)| (name.to_string(), filter))
            .collect();
        let mut context = processing.new_context(register::CONTEXT).unwrap();
        context.set(&acl_filter::FILTERS, filters).unwrap();
        processing.execute(Contexts::new().with(context)).await
    }

    #[tokio::test]
    async fn test_target_is_shared_property() {
        let processing = processing();
        let user = Arc::new(TypeModel::new("User").with_id("Id"));
        let by_user = filter(
            &processing,
            vec![
                invoker(&processing, "users.get", vec![Element::fixed("User"), property(&user, "Id")]),
                invoker(
                    &processing,
                    "users.posts",
                    vec![Element::fixed("User"), property(&user, "Id"), Element::fixed("Post")],
                ),
            ],
        );

        run(&processing, vec![("byUser", by_user.clone())]).await.unwrap();

        let context = by_user.read();
        assert_eq!(context.require(&acl_filter::TARGET_PROPERTY).unwrap().name(), "Id");
        assert_eq!(context.require(&acl_filter::TARGETS).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_filters_abort_with_their_invokers() {
        let processing = processing();
        let user = Arc::new(TypeModel::new("User").with_id("Id"));
        let post = Arc::new(TypeModel::new("Post").with_id("Id"));
        let mixed = filter(
            &processing,
            vec![
                invoker(&processing, "users.get", vec![property(&user, "Id")]),
                invoker(&processing, "posts.get", vec![property(&post, "Id")]),
            ],
        );
        let untargeted = filter(
            &processing,
            vec![invoker(&processing, "status", vec![Element::fixed("Status")])],
        );
        let valid = filter(
            &processing,
            vec![invoker(&processing, "users.one", vec![property(&user, "Id")])],
        );

        let err = run(
            &processing,
            vec![("mixed", mixed.clone()), ("untargeted", untargeted), ("valid", valid.clone())],
        )
        .await
        .unwrap_err();

        assert_eq!(err.processor(), Some("filter_target"));
        assert_eq!(
            err.as_abort().unwrap().reasons(),
            ["users.get", "posts.get", "status"]
        );
        assert!(!mixed.read().contains(&acl_filter::TARGET_PROPERTY));
        assert!(valid.read().contains(&acl_filter::TARGET_PROPERTY));
    }

    #[tokio::test]
    async fn test_no_filters() {
        let processing = processing();
        let context = processing.new_context(register::CONTEXT).unwrap();
        assert!(processing.execute(Contexts::new().with(context)).await.is_ok());
    }
}
