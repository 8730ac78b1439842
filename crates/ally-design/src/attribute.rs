//! Typed context attributes.
//!
//! An [`Attribute`] is a typed key naming one piece of data carried by a context.
//! Processors never declare raw names; they declare how they use an attribute key:
//!
//! | Usage      | Meaning                                                    |
//! |------------|------------------------------------------------------------|
//! | `Required` | The processor reads the value, somebody must define it     |
//! | `Optional` | The processor reads the value only if somebody defines it  |
//! | `Defined`  | The processor writes (and may read) the value              |
//!
//! # Example
//!
//! ```
//! use ally_design::attribute::{Attribute, Usage};
//!
//! const METHOD: Attribute<String> = Attribute::new("method");
//!
//! let spec = METHOD.requires();
//! assert_eq!(spec.name(), "method");
//! assert_eq!(spec.usage(), Usage::Required);
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// How a processor uses an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Usage {
    /// The attribute value must be provided by another processor or the caller.
    Required,
    /// The attribute value is used only when some other party defines it.
    Optional,
    /// The attribute value is provided by the declaring processor.
    Defined,
}

impl Usage {
    /// Returns the lowercase usage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
            Self::Defined => "defined",
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed attribute key.
///
/// Keys are `const`-constructible so contexts can be described with module
/// level constants. The value type must be cloneable so contexts can be copied
/// (see [`push_in`](crate::support::push_in)).
pub struct Attribute<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Attribute<T> {
    /// Creates a new attribute key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Returns the attribute name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: Clone + Send + Sync + 'static> Attribute<T> {
    /// Declares this attribute with the given usage.
    #[must_use]
    pub fn spec(&self, usage: Usage) -> AttributeSpec {
        AttributeSpec {
            name: self.name,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            usage,
            doc: None,
        }
    }

    /// Declares this attribute as required.
    #[must_use]
    pub fn requires(&self) -> AttributeSpec {
        self.spec(Usage::Required)
    }

    /// Declares this attribute as optional.
    #[must_use]
    pub fn optional(&self) -> AttributeSpec {
        self.spec(Usage::Optional)
    }

    /// Declares this attribute as defined.
    #[must_use]
    pub fn defines(&self) -> AttributeSpec {
        self.spec(Usage::Defined)
    }
}

impl<T> Clone for Attribute<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Attribute<T> {}

impl<T> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &type_name::<T>())
            .finish()
    }
}

/// A single attribute declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    usage: Usage,
    doc: Option<&'static str>,
}

impl AttributeSpec {
    /// Attaches documentation to the declaration.
    #[must_use]
    pub fn doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }

    /// Returns the attribute name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the value type identifier.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the value type name, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the declared usage.
    #[must_use]
    pub const fn usage(&self) -> Usage {
        self.usage
    }

    /// Returns the declaration documentation.
    #[must_use]
    pub const fn documentation(&self) -> Option<&'static str> {
        self.doc
    }
}

/// Object safe cloning for attribute values stored in contexts.
pub trait AttributeValue: Any + Send + Sync {
    /// Clones the value into a new box.
    fn clone_value(&self) -> Box<dyn AttributeValue>;

    /// Upcasts to [`Any`].
    fn as_any(&self) -> &dyn Any;

    /// Upcasts to mutable [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Upcasts the box to [`Any`].
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Clone + Send + Sync + 'static> AttributeValue for T {
    fn clone_value(&self) -> Box<dyn AttributeValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
