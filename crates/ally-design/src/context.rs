//! Context declarations and runtime contexts.
//!
//! A [`ContextSpec`] is what a processor declares: a context name plus the
//! attributes it requires, defines or optionally uses. Once all declarations of
//! an assembly are resolved, each context name gets a [`ContextSchema`], and
//! every [`Context`] created during execution is bound to that schema.
//!
//! # Example
//!
//! ```
//! use ally_design::attribute::Attribute;
//! use ally_design::context::ContextSpec;
//!
//! const URI: Attribute<String> = Attribute::new("uri");
//! const STATUS: Attribute<u16> = Attribute::new("status");
//!
//! let request = ContextSpec::argument("request").requires(&URI);
//! let response = ContextSpec::argument("response").defines(&STATUS);
//!
//! assert_eq!(request.name(), "request");
//! assert_eq!(response.attributes().count(), 1);
//! ```

use crate::attribute::{Attribute, AttributeSpec, AttributeValue, Usage};
use crate::error::ContextError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A context referenced from several places (invokers, nodes, content parts).
pub type SharedContext = Arc<RwLock<Context>>;

/// Wraps a context for sharing.
#[must_use]
pub fn share(context: Context) -> SharedContext {
    Arc::new(RwLock::new(context))
}

/// How a context reaches processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Passed by name to every processor of the chain.
    Argument,
    /// Created by processors and carried inside other contexts.
    Nested,
}

/// The declaration of a named context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSpec {
    name: String,
    kind: ContextKind,
    attributes: IndexMap<&'static str, AttributeSpec>,
}

impl ContextSpec {
    /// Declares an argument context.
    #[must_use]
    pub fn argument(name: impl Into<String>) -> Self {
        Self::new(name, ContextKind::Argument)
    }

    /// Declares a nested context.
    #[must_use]
    pub fn nested(name: impl Into<String>) -> Self {
        Self::new(name, ContextKind::Nested)
    }

    /// Declares a context that only reserves its name.
    #[must_use]
    pub fn placeholder(name: impl Into<String>, kind: ContextKind) -> Self {
        Self::new(name, kind)
    }

    fn new(name: impl Into<String>, kind: ContextKind) -> Self {
        Self {
            name: name.into(),
            kind,
            attributes: IndexMap::new(),
        }
    }

    /// Adds a required attribute.
    #[must_use]
    pub fn requires<T: Clone + Send + Sync + 'static>(self, attribute: &Attribute<T>) -> Self {
        self.with(attribute.requires())
    }

    /// Adds an optional attribute.
    #[must_use]
    pub fn optional<T: Clone + Send + Sync + 'static>(self, attribute: &Attribute<T>) -> Self {
        self.with(attribute.optional())
    }

    /// Adds a defined attribute.
    #[must_use]
    pub fn defines<T: Clone + Send + Sync + 'static>(self, attribute: &Attribute<T>) -> Self {
        self.with(attribute.defines())
    }

    /// Adds a documented, defined attribute.
    #[must_use]
    pub fn documented<T: Clone + Send + Sync + 'static>(
        self,
        attribute: &Attribute<T>,
        doc: &'static str,
    ) -> Self {
        self.with(attribute.defines().doc(doc))
    }

    /// Adds an attribute declaration, replacing any previous one with the same name.
    #[must_use]
    pub fn with(mut self, spec: AttributeSpec) -> Self {
        self.attributes.insert(spec.name(), spec);
        self
    }

    /// Inherits the attributes of another declaration.
    ///
    /// Attributes already declared on `self` take precedence.
    #[must_use]
    pub fn extend(mut self, parent: &ContextSpec) -> Self {
        for (name, spec) in &parent.attributes {
            self.attributes.entry(name).or_insert_with(|| spec.clone());
        }
        self
    }

    /// Renames the declaration, keeping the attributes.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the context name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the context kind.
    #[must_use]
    pub const fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Returns the attribute declarations in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.attributes.values()
    }

    /// Returns the declaration for an attribute name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.get(name)
    }

    /// Returns true if the declaration has the attribute with the given usage.
    #[must_use]
    pub fn uses(&self, name: &str, usage: Usage) -> bool {
        self.attributes
            .get(name)
            .is_some_and(|spec| spec.usage() == usage)
    }
}

/// One attribute of a resolved schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaAttribute {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) docs: Vec<&'static str>,
}

impl SchemaAttribute {
    /// Returns the value type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the collected documentation.
    #[must_use]
    pub fn docs(&self) -> &[&'static str] {
        &self.docs
    }
}

/// The resolved attribute set of a context name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSchema {
    name: String,
    kind: ContextKind,
    attributes: IndexMap<&'static str, SchemaAttribute>,
}

impl ContextSchema {
    pub(crate) fn new(
        name: String,
        kind: ContextKind,
        attributes: IndexMap<&'static str, SchemaAttribute>,
    ) -> Self {
        Self {
            name,
            kind,
            attributes,
        }
    }

    /// Builds a schema straight from a single declaration.
    ///
    /// Every declared attribute is kept regardless of usage. This is meant for
    /// contexts created outside of a processing, mostly in tests.
    #[must_use]
    pub fn from_spec(spec: &ContextSpec) -> Self {
        let attributes = spec
            .attributes()
            .map(|attribute| {
                (
                    attribute.name(),
                    SchemaAttribute {
                        type_id: attribute.type_id(),
                        type_name: attribute.type_name(),
                        docs: attribute.documentation().into_iter().collect(),
                    },
                )
            })
            .collect();
        Self::new(spec.name().to_string(), spec.kind(), attributes)
    }

    /// Returns the context name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the context kind.
    #[must_use]
    pub const fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Returns true if the schema contains the attribute.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Returns the attribute names in resolution order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes.keys().copied()
    }

    /// Returns the schema attribute for a name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.get(name)
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the schema has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// A runtime context instance.
///
/// Values can only be stored for attributes of the bound schema, with the
/// type the schema declares.
pub struct Context {
    schema: Arc<ContextSchema>,
    values: HashMap<&'static str, Box<dyn AttributeValue>>,
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            values: self
                .values
                .iter()
                .map(|(name, value)| (*name, (**value).clone_value()))
                .collect(),
        }
    }
}

impl Context {
    /// Creates an empty context bound to a schema.
    #[must_use]
    pub fn new(schema: Arc<ContextSchema>) -> Self {
        Self {
            schema,
            values: HashMap::new(),
        }
    }

    /// Creates an empty context straight from a declaration.
    #[must_use]
    pub fn from_spec(spec: &ContextSpec) -> Self {
        Self::new(Arc::new(ContextSchema::from_spec(spec)))
    }

    /// Returns the bound schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<ContextSchema> {
        &self.schema
    }

    /// Returns the context name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Returns true if the schema has the attribute.
    ///
    /// This is how optional attributes are probed: an optional attribute
    /// nobody defines is not part of the schema.
    #[must_use]
    pub fn has_attribute<T>(&self, attribute: &Attribute<T>) -> bool {
        self.schema.has_attribute(attribute.name())
    }

    /// Returns true if the attribute has a value.
    #[must_use]
    pub fn contains<T>(&self, attribute: &Attribute<T>) -> bool {
        self.values.contains_key(attribute.name())
    }

    /// Returns true if the attribute with the name has a value.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the attribute value, if any.
    ///
    /// Attributes outside of the schema simply have no value.
    pub fn get<T: Clone + Send + Sync + 'static>(
        &self,
        attribute: &Attribute<T>,
    ) -> Result<Option<&T>, ContextError> {
        self.check::<T>(attribute.name(), false)?;
        Ok(self
            .values
            .get(attribute.name())
            .and_then(|value| (**value).as_any().downcast_ref::<T>()))
    }

    /// Returns the attribute value or a [`ContextError::MissingValue`].
    pub fn require<T: Clone + Send + Sync + 'static>(
        &self,
        attribute: &Attribute<T>,
    ) -> Result<&T, ContextError> {
        self.get(attribute)?
            .ok_or_else(|| ContextError::MissingValue {
                context: self.name().to_string(),
                attribute: attribute.name().to_string(),
            })
    }

    /// Returns a mutable reference to the attribute value, if any.
    pub fn get_mut<T: Clone + Send + Sync + 'static>(
        &mut self,
        attribute: &Attribute<T>,
    ) -> Result<Option<&mut T>, ContextError> {
        self.check::<T>(attribute.name(), false)?;
        Ok(self
            .values
            .get_mut(attribute.name())
            .and_then(|value| (**value).as_any_mut().downcast_mut::<T>()))
    }

    /// Returns the value, inserting the result of `init` when absent.
    pub fn get_or_insert_with<T, F>(
        &mut self,
        attribute: &Attribute<T>,
        init: F,
    ) -> Result<&mut T, ContextError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.check::<T>(attribute.name(), true)?;
        let value = self
            .values
            .entry(attribute.name())
            .or_insert_with(|| Box::new(init()));
        (**value)
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| self_mismatch::<T>(&self.schema, attribute.name()))
    }

    /// Sets the attribute value, returning the previous one.
    pub fn set<T: Clone + Send + Sync + 'static>(
        &mut self,
        attribute: &Attribute<T>,
        value: T,
    ) -> Result<Option<T>, ContextError> {
        self.check::<T>(attribute.name(), true)?;
        Ok(self
            .values
            .insert(attribute.name(), Box::new(value))
            .and_then(|previous| previous.into_any().downcast::<T>().ok())
            .map(|previous| *previous))
    }

    /// Removes and returns the attribute value.
    pub fn take<T: Clone + Send + Sync + 'static>(
        &mut self,
        attribute: &Attribute<T>,
    ) -> Result<Option<T>, ContextError> {
        self.check::<T>(attribute.name(), false)?;
        Ok(self
            .values
            .remove(attribute.name())
            .and_then(|value| value.into_any().downcast::<T>().ok())
            .map(|value| *value))
    }

    /// Returns the names of the attributes that have values.
    pub fn present(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schema
            .attribute_names()
            .filter(|name| self.values.contains_key(name))
    }

    pub(crate) fn raw(&self, name: &str) -> Option<&dyn AttributeValue> {
        self.values.get(name).map(|value| &**value)
    }

    pub(crate) fn set_raw(&mut self, name: &'static str, value: Box<dyn AttributeValue>) -> bool {
        match self.schema.attribute(name) {
            Some(attribute) if attribute.type_id == (*value).as_any().type_id() => {
                self.values.insert(name, value);
                true
            }
            _ => false,
        }
    }

    fn check<T: 'static>(&self, name: &str, writing: bool) -> Result<(), ContextError> {
        match self.schema.attribute(name) {
            Some(attribute) if attribute.type_id == TypeId::of::<T>() => Ok(()),
            Some(_) => Err(self_mismatch::<T>(&self.schema, name)),
            None if writing => Err(ContextError::UnknownAttribute {
                context: self.name().to_string(),
                attribute: name.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn self_mismatch<T>(schema: &ContextSchema, name: &str) -> ContextError {
    ContextError::TypeMismatch {
        context: schema.name().to_string(),
        attribute: name.to_string(),
        expected: schema.attribute(name).map_or("<none>", |a| a.type_name),
        found: type_name::<T>(),
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.schema.name())
            .field("present", &self.present().collect::<Vec<_>>())
            .finish()
    }
}

/// The argument contexts of a chain, by name.
#[derive(Debug, Clone, Default)]
pub struct Contexts {
    contexts: IndexMap<String, Context>,
}

impl Contexts {
    /// Creates an empty set of contexts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a context under its schema name.
    #[must_use]
    pub fn with(mut self, context: Context) -> Self {
        self.insert(context);
        self
    }

    /// Adds or replaces a context under its schema name.
    pub fn insert(&mut self, context: Context) -> Option<Context> {
        self.contexts.insert(context.name().to_string(), context)
    }

    /// Returns the context for a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    /// Returns the mutable context for a name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.get_mut(name)
    }

    /// Removes the context for a name.
    pub fn take(&mut self, name: &str) -> Option<Context> {
        self.contexts.shift_remove(name)
    }

    /// Returns true if a context with the name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.contexts.contains_key(name)
    }

    /// Returns the context names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    /// Returns the number of contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns true if there are no contexts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: Attribute<String> = Attribute::new("uri");
    const STATUS: Attribute<u16> = Attribute::new("status");
    const WRONG_STATUS: Attribute<String> = Attribute::new("status");
    const UNKNOWN: Attribute<bool> = Attribute::new("unknown");

    fn request() -> Context {
        Context::from_spec(
            &ContextSpec::argument("request")
                .requires(&URI)
                .defines(&STATUS),
        )
    }

    #[test]
    fn test_set_and_get() {
        let mut ctx = request();
        assert_eq!(ctx.set(&URI, "/resources".to_string()).unwrap(), None);
        assert_eq!(ctx.get(&URI).unwrap().map(String::as_str), Some("/resources"));

        let previous = ctx.set(&URI, "/other".to_string()).unwrap();
        assert_eq!(previous.as_deref(), Some("/resources"));
    }

    #[test]
    fn test_unknown_attribute_write_fails() {
        let mut ctx = request();
        let err = ctx.set(&UNKNOWN, true).unwrap_err();
        assert!(matches!(err, ContextError::UnknownAttribute { .. }));

        // Reading an attribute outside of the schema is just absent.
        assert_eq!(ctx.get(&UNKNOWN).unwrap(), None);
        assert!(!ctx.has_attribute(&UNKNOWN));
    }

    #[test]
    fn test_type_mismatch() {
        let mut ctx = request();
        ctx.set(&STATUS, 200).unwrap();
        let err = ctx.set(&WRONG_STATUS, "200".to_string()).unwrap_err();
        assert!(matches!(err, ContextError::TypeMismatch { .. }));
        assert!(ctx.get(&WRONG_STATUS).is_err());
    }

    #[test]
    fn test_require_missing() {
        let ctx = request();
        let err = ctx.require(&URI).unwrap_err();
        assert_eq!(err.to_string(), "attribute 'request.uri' has no value");
    }

    #[test]
    fn test_take_and_get_or_insert() {
        let mut ctx = request();
        *ctx.get_or_insert_with(&STATUS, || 100).unwrap() += 1;
        assert_eq!(ctx.get(&STATUS).unwrap(), Some(&101));

        assert_eq!(ctx.take(&STATUS).unwrap(), Some(101));
        assert!(!ctx.contains(&STATUS));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut ctx = request();
        ctx.set(&URI, "a".to_string()).unwrap();
        let mut copy = ctx.clone();
        copy.set(&URI, "b".to_string()).unwrap();
        assert_eq!(ctx.get(&URI).unwrap().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_extend_keeps_own_declarations() {
        const NAME: Attribute<String> = Attribute::new("name");
        let parent = ContextSpec::nested("Repository").requires(&NAME).requires(&URI);
        let child = ContextSpec::nested("RepositoryGroup")
            .defines(&NAME)
            .extend(&parent);

        assert!(child.uses("name", Usage::Defined));
        assert!(child.uses("uri", Usage::Required));
        assert_eq!(child.attributes().count(), 2);
    }

    #[test]
    fn test_contexts_by_name() {
        let contexts = Contexts::new().with(request());
        assert!(contexts.contains("request"));
        assert_eq!(contexts.names().collect::<Vec<_>>(), vec!["request"]);
    }

    #[test]
    fn test_debug_lists_present() {
        let mut ctx = request();
        ctx.set(&STATUS, 204).unwrap();
        let debug = format!("{ctx:?}");
        assert!(debug.contains("request"));
        assert!(debug.contains("status"));
    }
}
