//! ACL entities and the services storing them.
//!
//! The services are implemented by the persistence layer of the
//! application. Synchronization only needs to list, insert and delete.

use crate::error::SyncResult;
use ally_design::BoxFuture;
use std::fmt;

/// The id of a right.
pub type RightId = i64;

/// A group of users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// The unique group name, also its id.
    pub name: String,
    /// True if the group applies to unauthenticated users.
    pub is_anonymous: bool,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group '{}'", self.name)
    }
}

/// The type rights are grouped by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RightType {
    /// The unique type name, also its id.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// A right granted to groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Right {
    /// The id, none until inserted.
    pub id: Option<RightId>,
    /// The right name, unique per type.
    pub name: String,
    /// The right type name.
    pub right_type: String,
    /// Optional description.
    pub description: Option<String>,
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "right '{}' of type '{}'", self.name, self.right_type)
    }
}

/// Inserts and deletes one kind of entity.
pub trait EntityService: Send + Sync {
    /// The stored entity.
    type Entity: fmt::Display + Send;
    /// The entity id.
    type Id: Clone + Send + Sync;

    /// Inserts an entity, returning its id.
    fn insert(&self, entity: Self::Entity) -> BoxFuture<'_, SyncResult<Self::Id>>;

    /// Deletes an entity, returning false if it did not exist.
    fn delete(&self, id: Self::Id) -> BoxFuture<'_, SyncResult<bool>>;
}

/// Stores groups, identified by name.
pub trait GroupService: EntityService<Entity = Group, Id = String> {
    /// Returns the names of all groups.
    fn get_all(&self) -> BoxFuture<'_, SyncResult<Vec<String>>>;
}

/// Stores rights.
pub trait RightService: EntityService<Entity = Right, Id = RightId> {
    /// Returns the rights of a type.
    fn get_all<'a>(&'a self, right_type: &'a str) -> BoxFuture<'a, SyncResult<Vec<Right>>>;
}

/// Stores right types, identified by name.
pub trait RightTypeService: Send + Sync {
    /// Returns the type with the name, if any.
    fn get_by_id<'a>(&'a self, name: &'a str) -> BoxFuture<'a, SyncResult<Option<RightType>>>;

    /// Inserts a type, returning its name.
    fn insert(&self, right_type: RightType) -> BoxFuture<'_, SyncResult<String>>;
}
