//! Dependency injection container.
//!
//! Services are registered while an application is wired and resolved by
//! processors and setup code. A service is either registered once for its
//! type, or as a named entity when several instances of one type coexist
//! (several assemblies, several repositories).
//!
//! # Example
//!
//! ```rust
//! use ally_core::{Container, Inject};
//! use std::sync::Arc;
//!
//! struct Repository {
//!     path: String,
//! }
//!
//! let mut container = Container::new();
//! container.register(Arc::new(Repository { path: "/srv/content".into() }));
//! container.register_named("archive", Arc::new(Repository { path: "/srv/archive".into() }));
//!
//! let repository: Arc<Repository> = container.resolve().unwrap();
//! assert_eq!(repository.path, "/srv/content");
//!
//! let archive = Inject::<Repository>::named(&container, "archive").unwrap();
//! assert_eq!(archive.path, "/srv/archive");
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error when a dependency cannot be resolved.
#[derive(Debug, Clone)]
pub struct InjectionError {
    /// The type name that could not be resolved.
    pub type_name: &'static str,
    /// The entity name, for named entities.
    pub entity: Option<String>,
    /// The reason for the failure.
    pub reason: String,
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(
                f,
                "Failed to inject {} '{}': {}",
                self.type_name, entity, self.reason
            ),
            None => write!(f, "Failed to inject {}: {}", self.type_name, self.reason),
        }
    }
}

impl std::error::Error for InjectionError {}

impl InjectionError {
    /// Creates an injection error for a missing service.
    pub fn not_registered<T>() -> Self {
        Self {
            type_name: type_name::<T>(),
            entity: None,
            reason: "service not registered".to_string(),
        }
    }

    /// Creates an injection error for a missing named entity.
    pub fn entity_not_registered<T>(entity: impl Into<String>) -> Self {
        Self {
            type_name: type_name::<T>(),
            entity: Some(entity.into()),
            reason: "entity not registered".to_string(),
        }
    }

    /// Creates an injection error with a custom reason.
    pub fn custom<T>(reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name::<T>(),
            entity: None,
            reason: reason.into(),
        }
    }
}

type Service = Arc<dyn Any + Send + Sync>;

/// A dependency injection container.
///
/// # Thread Safety
///
/// The container is `Send + Sync`. Services must be `Arc<T>` where
/// `T: Send + Sync`.
#[derive(Default)]
pub struct Container {
    services: HashMap<TypeId, Service>,
    entities: HashMap<(TypeId, String), Service>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the service of a type, replacing any previous one.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Registers a named entity.
    ///
    /// Entities with the same name but different types do not collide.
    pub fn register_named<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        entity: Arc<T>,
    ) {
        self.entities.insert((TypeId::of::<T>(), name.into()), entity);
    }

    /// Resolves the service of a type.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| Arc::clone(s).downcast::<T>().ok())
    }

    /// Resolves a named entity.
    #[must_use]
    pub fn resolve_named<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.entities
            .get(&(TypeId::of::<T>(), name.to_string()))
            .and_then(|s| Arc::clone(s).downcast::<T>().ok())
    }

    /// Resolves a service or returns an error.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError` if the service is not registered.
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        self.resolve().ok_or_else(InjectionError::not_registered::<T>)
    }

    /// Resolves a named entity or returns an error.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError` if the entity is not registered.
    pub fn resolve_named_required<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, InjectionError> {
        self.resolve_named(name)
            .ok_or_else(|| InjectionError::entity_not_registered::<T>(name))
    }

    /// Checks if the service of a type is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Checks if a named entity of a type is registered.
    #[must_use]
    pub fn contains_named<T: Send + Sync + 'static>(&self, name: &str) -> bool {
        self.entities
            .contains_key(&(TypeId::of::<T>(), name.to_string()))
    }

    /// Returns the sorted names of the registered entities of a type.
    #[must_use]
    pub fn names<T: Send + Sync + 'static>(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entities
            .keys()
            .filter(|(type_id, _)| *type_id == TypeId::of::<T>())
            .map(|(_, name)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered services and entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len() + self.entities.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.entities.is_empty()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.services.len())
            .field("entity_count", &self.entities.len())
            .finish()
    }
}

/// A resolved dependency.
#[derive(Clone)]
pub struct Inject<T>(pub Arc<T>);

impl<T> Inject<T> {
    /// Creates a new `Inject` wrapper.
    pub fn new(inner: Arc<T>) -> Self {
        Self(inner)
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &T {
        &self.0
    }

    /// Converts into the inner `Arc`.
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T> std::ops::Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Inject").field(&self.0).finish()
    }
}

impl<T: Send + Sync + 'static> Inject<T> {
    /// Extracts the service of the type from a container.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError` if the service is not registered.
    pub fn from_container(container: &Container) -> Result<Self, InjectionError> {
        container.resolve_required::<T>().map(Inject)
    }

    /// Extracts a named entity from a container.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError` if the entity is not registered.
    pub fn named(container: &Container, name: &str) -> Result<Self, InjectionError> {
        container.resolve_named_required::<T>(name).map(Inject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Assembly {
        name: String,
    }

    impl Assembly {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
            }
        }
    }

    #[test]
    fn test_container_new() {
        let container = Container::new();
        assert!(container.is_empty());
        assert_eq!(container.len(), 0);
    }

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        container.register(Arc::new(Assembly::new("server")));

        let assembly: Arc<Assembly> = container.resolve().unwrap();
        assert_eq!(assembly.name, "server");
        assert!(container.contains::<Assembly>());
    }

    #[test]
    fn test_resolve_missing() {
        let container = Container::new();
        assert!(container.resolve::<Assembly>().is_none());

        let err = container.resolve_required::<Assembly>().unwrap_err();
        assert!(err.to_string().contains("Assembly"));
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_named_entities_do_not_shadow_the_type_service() {
        let mut container = Container::new();
        container.register(Arc::new(Assembly::new("default")));
        container.register_named("server", Arc::new(Assembly::new("server")));
        container.register_named("assembler", Arc::new(Assembly::new("assembler")));

        assert_eq!(container.resolve::<Assembly>().unwrap().name, "default");
        assert_eq!(
            container.resolve_named::<Assembly>("assembler").unwrap().name,
            "assembler"
        );
        assert_eq!(container.names::<Assembly>(), ["assembler", "server"]);
        assert_eq!(container.len(), 3);
    }

    #[test]
    fn test_named_entity_is_typed() {
        let mut container = Container::new();
        container.register_named("server", Arc::new(Assembly::new("server")));

        assert!(container.contains_named::<Assembly>("server"));
        assert!(!container.contains_named::<String>("server"));
        let err = container.resolve_named_required::<String>("server").unwrap_err();
        assert!(err.to_string().contains("'server'"));
    }

    #[test]
    fn test_inject() {
        let mut container = Container::new();
        container.register(Arc::new(Assembly::new("inject")));
        container.register_named("named", Arc::new(Assembly::new("named")));

        let inject = Inject::<Assembly>::from_container(&container).unwrap();
        assert_eq!(inject.name, "inject");
        assert_eq!(Inject::<Assembly>::named(&container, "named").unwrap().name, "named");
        assert!(Inject::<String>::from_container(&container).is_err());
    }
}
