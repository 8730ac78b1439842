//! In-memory services for tests.

use crate::error::{SyncError, SyncResult};
use crate::service::{
    EntityService, Group, GroupService, Right, RightId, RightService, RightType, RightTypeService,
};
use ally_design::BoxFuture;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Groups by name. Inserting a name listed in `failing` fails.
#[derive(Debug, Default)]
pub struct MemoryGroups {
    pub groups: Mutex<IndexMap<String, Group>>,
    pub failing: HashSet<String>,
}

impl MemoryGroups {
    pub fn with(names: &[&str]) -> Self {
        let groups = names
            .iter()
            .map(|name| {
                let group = Group {
                    name: (*name).to_string(),
                    is_anonymous: false,
                };
                ((*name).to_string(), group)
            })
            .collect();
        Self {
            groups: Mutex::new(groups),
            failing: HashSet::new(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.groups.lock().keys().cloned().collect()
    }
}

impl EntityService for MemoryGroups {
    type Entity = Group;
    type Id = String;

    fn insert(&self, entity: Group) -> BoxFuture<'_, SyncResult<String>> {
        Box::pin(async move {
            if self.failing.contains(&entity.name) {
                return Err(SyncError::service("group", "constraint violated"));
            }
            let name = entity.name.clone();
            self.groups.lock().insert(name.clone(), entity);
            Ok(name)
        })
    }

    fn delete(&self, id: String) -> BoxFuture<'_, SyncResult<bool>> {
        Box::pin(async move { Ok(self.groups.lock().shift_remove(&id).is_some()) })
    }
}

impl GroupService for MemoryGroups {
    fn get_all(&self) -> BoxFuture<'_, SyncResult<Vec<String>>> {
        Box::pin(async move { Ok(self.names()) })
    }
}

/// Rights by id.
#[derive(Debug, Default)]
pub struct MemoryRights {
    pub rights: Mutex<IndexMap<RightId, Right>>,
}

impl MemoryRights {
    pub fn add(&self, name: &str, right_type: &str) -> RightId {
        let mut rights = self.rights.lock();
        let id = rights.keys().max().map_or(1, |id| id + 1);
        rights.insert(
            id,
            Right {
                id: Some(id),
                name: name.to_string(),
                right_type: right_type.to_string(),
                description: None,
            },
        );
        id
    }

    pub fn find(&self, name: &str) -> Option<Right> {
        self.rights
            .lock()
            .values()
            .find(|right| right.name == name)
            .cloned()
    }
}

impl EntityService for MemoryRights {
    type Entity = Right;
    type Id = RightId;

    fn insert(&self, entity: Right) -> BoxFuture<'_, SyncResult<RightId>> {
        Box::pin(async move {
            let id = self.add(&entity.name, &entity.right_type);
            if let Some(right) = self.rights.lock().get_mut(&id) {
                right.description = entity.description;
            }
            Ok(id)
        })
    }

    fn delete(&self, id: RightId) -> BoxFuture<'_, SyncResult<bool>> {
        Box::pin(async move { Ok(self.rights.lock().shift_remove(&id).is_some()) })
    }
}

impl RightService for MemoryRights {
    fn get_all<'a>(&'a self, right_type: &'a str) -> BoxFuture<'a, SyncResult<Vec<Right>>> {
        Box::pin(async move {
            Ok(self
                .rights
                .lock()
                .values()
                .filter(|right| right.right_type == right_type)
                .cloned()
                .collect())
        })
    }
}

/// Right types by name.
#[derive(Debug, Default)]
pub struct MemoryRightTypes {
    pub types: Mutex<IndexMap<String, RightType>>,
}

impl RightTypeService for MemoryRightTypes {
    fn get_by_id<'a>(&'a self, name: &'a str) -> BoxFuture<'a, SyncResult<Option<RightType>>> {
        Box::pin(async move { Ok(self.types.lock().get(name).cloned()) })
    }

    fn insert(&self, right_type: RightType) -> BoxFuture<'_, SyncResult<String>> {
        Box::pin(async move {
            let name = right_type.name.clone();
            self.types.lock().insert(name.clone(), right_type);
            Ok(name)
        })
    }
}
