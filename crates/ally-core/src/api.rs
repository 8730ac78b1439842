//! API types.
//!
//! The minimal type system the pipeline needs to bind invoker inputs, check
//! returned values and dispatch by method. Values travel as
//! [`serde_json::Value`].
//!
//! ```
//! use ally_core::api::{is_model_id, ApiType, TypeModel};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let user = Arc::new(TypeModel::new("User").with_domain("Auth/").with_id("Id"));
//! let id = ApiType::property(&user, "Id", ApiType::Integer);
//!
//! assert!(is_model_id(&id));
//! assert!(id.is_of(&ApiType::Integer));
//! assert!(ApiType::iter(ApiType::Model(user)).is_valid(&json!([{"Id": 1}])));
//! ```

use ally_design::processor::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The API call methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Reads models.
    Get,
    /// Creates a model.
    Insert,
    /// Modifies a model.
    Update,
    /// Removes a model.
    Delete,
}

impl Method {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeModel {
    name: String,
    domain: Option<String>,
    id: Option<String>,
}

impl TypeModel {
    /// Creates a model type.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
            id: None,
        }
    }

    /// Sets the model domain, for instance `ACL/`.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the name of the id property.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the model domain.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Returns the name of the id property.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// The owner of a property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyParent {
    /// A model property.
    Model(Arc<TypeModel>),
    /// An option of an option group; option inputs are keyword arguments.
    Option(String),
}

impl PropertyParent {
    /// Returns the parent name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Model(model) => model.name(),
            Self::Option(group) => group,
        }
    }
}

/// A property type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeProperty {
    parent: PropertyParent,
    name: String,
    kind: ApiType,
}

impl TypeProperty {
    /// Creates a model property.
    #[must_use]
    pub fn of_model(model: &Arc<TypeModel>, name: impl Into<String>, kind: ApiType) -> Self {
        Self {
            parent: PropertyParent::Model(Arc::clone(model)),
            name: name.into(),
            kind,
        }
    }

    /// Creates an option of an option group.
    #[must_use]
    pub fn option(group: impl Into<String>, name: impl Into<String>, kind: ApiType) -> Self {
        Self {
            parent: PropertyParent::Option(group.into()),
            name: name.into(),
            kind,
        }
    }

    /// Returns the owner of the property.
    #[must_use]
    pub const fn parent(&self) -> &PropertyParent {
        &self.parent
    }

    /// Returns the property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the property value type.
    #[must_use]
    pub const fn kind(&self) -> &ApiType {
        &self.kind
    }

    /// Returns the parent model, if the property belongs to one.
    #[must_use]
    pub fn model(&self) -> Option<&Arc<TypeModel>> {
        match &self.parent {
            PropertyParent::Model(model) => Some(model),
            PropertyParent::Option(_) => None,
        }
    }

    /// Returns true for option properties.
    #[must_use]
    pub const fn is_option(&self) -> bool {
        matches!(self.parent, PropertyParent::Option(_))
    }
}

/// An API type.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiType {
    /// No value.
    None,
    /// A boolean.
    Boolean,
    /// An integer.
    Integer,
    /// A floating point number.
    Number,
    /// A string.
    String,
    /// A model.
    Model(Arc<TypeModel>),
    /// A model or option property.
    Property(Arc<TypeProperty>),
    /// A collection.
    Iter(Box<ApiType>),
}

impl ApiType {
    /// Creates a property type of a model.
    #[must_use]
    pub fn property(model: &Arc<TypeModel>, name: impl Into<String>, kind: ApiType) -> Self {
        Self::Property(Arc::new(TypeProperty::of_model(model, name, kind)))
    }

    /// Creates a collection type.
    #[must_use]
    pub fn iter(item: ApiType) -> Self {
        Self::Iter(Box::new(item))
    }

    /// Returns true if the type is, or a property holding, `other`.
    #[must_use]
    pub fn is_of(&self, other: &ApiType) -> bool {
        if self == other {
            return true;
        }
        match self {
            Self::Property(property) => property.kind().is_of(other),
            _ => false,
        }
    }

    /// Returns true if `value` is valid for the type.
    ///
    /// Null is valid for any type.
    #[must_use]
    pub fn is_valid(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            Self::None => false,
            Self::Boolean => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Model(_) => value.is_object(),
            Self::Property(property) => property.kind().is_valid(value),
            Self::Iter(item) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|value| item.is_valid(value))),
        }
    }

    /// Returns the model of a model type.
    #[must_use]
    pub fn as_model(&self) -> Option<&Arc<TypeModel>> {
        match self {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Boolean => f.write_str("bool"),
            Self::Integer => f.write_str("int"),
            Self::Number => f.write_str("float"),
            Self::String => f.write_str("str"),
            Self::Model(model) => f.write_str(model.name()),
            Self::Property(property) => {
                write!(f, "{}.{}", property.parent().name(), property.name())
            }
            Self::Iter(item) => write!(f, "Iter({item})"),
        }
    }
}

/// Returns true if the type is the id property of its model.
#[must_use]
pub fn is_model_id(kind: &ApiType) -> bool {
    match kind {
        ApiType::Property(property) => property
            .model()
            .is_some_and(|model| model.id() == Some(property.name())),
        _ => false,
    }
}

/// An invoker input.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    name: String,
    kind: ApiType,
    default: Option<Value>,
}

impl Input {
    /// Creates a mandatory input.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ApiType) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Returns the input name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the input type.
    #[must_use]
    pub const fn kind(&self) -> &ApiType {
        &self.kind
    }

    /// Returns the default value.
    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns true if the input is an option, bound as a keyword argument.
    #[must_use]
    pub fn is_option(&self) -> bool {
        matches!(&self.kind, ApiType::Property(property) if property.is_option())
    }
}

/// The description of a service call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// The call name.
    pub name: String,
    /// The call method.
    pub method: Method,
    /// The call inputs.
    pub inputs: Vec<Input>,
    /// The call output.
    pub output: ApiType,
}

/// One input error message, optionally about a model or model property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    /// The message.
    pub message: String,
    /// The model the message refers to.
    pub model: Option<String>,
    /// The property the message refers to.
    pub property: Option<String>,
}

impl Ref {
    /// Creates a general message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: None,
            property: None,
        }
    }

    /// Refers the message to a model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Refers the message to a model property.
    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }
}

/// Invalid input supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    messages: Vec<Ref>,
}

impl InputError {
    /// Creates an input error with one message.
    #[must_use]
    pub fn new(message: Ref) -> Self {
        Self {
            messages: vec![message],
        }
    }

    /// Adds a message.
    pub fn with(mut self, message: Ref) -> Self {
        self.messages.push(message);
        self
    }

    /// Returns the messages.
    #[must_use]
    pub fn messages(&self) -> &[Ref] {
        &self.messages
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid input: ")?;
        for (index, message) in self.messages.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match (&message.model, &message.property) {
                (Some(model), Some(property)) => write!(f, "{model}.{property} ")?,
                (Some(model), None) => write!(f, "{model} ")?,
                _ => {}
            }
            f.write_str(&message.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for InputError {}

/// Errors returned by an invoke.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The caller supplied invalid input.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Request arguments, keyed by input name or by input type name.
pub type Arguments = IndexMap<String, Value>;

/// Keyword arguments.
pub type Options = IndexMap<String, Value>;

/// Callback adjusting the arguments before binding.
pub type Prepare = Arc<dyn Fn(&mut Arguments) + Send + Sync>;

/// The callable behind an invoker.
pub trait Invoke: Send + Sync {
    /// Invokes with positional and keyword arguments.
    fn invoke<'a>(
        &'a self,
        args: Vec<Value>,
        options: Options,
    ) -> BoxFuture<'a, Result<Value, InvokeError>>;
}

/// An [`Invoke`] built from a synchronous function.
pub struct FnInvoke<F>(F);

impl<F> Invoke for FnInvoke<F>
where
    F: Fn(Vec<Value>, Options) -> Result<Value, InvokeError> + Send + Sync,
{
    fn invoke<'a>(
        &'a self,
        args: Vec<Value>,
        options: Options,
    ) -> BoxFuture<'a, Result<Value, InvokeError>> {
        Box::pin(async move { (self.0)(args, options) })
    }
}

/// Wraps a synchronous function as a shared [`Invoke`].
pub fn invoke_fn<F>(func: F) -> Arc<dyn Invoke>
where
    F: Fn(Vec<Value>, Options) -> Result<Value, InvokeError> + Send + Sync + 'static,
{
    Arc::new(FnInvoke(func))
}

/// One element of an invoker path.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    property: Option<Arc<TypeProperty>>,
}

impl Element {
    /// Creates a fixed path element.
    #[must_use]
    pub fn fixed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property: None,
        }
    }

    /// Creates a path element holding a property value.
    #[must_use]
    pub fn property(property: Arc<TypeProperty>) -> Self {
        Self {
            name: property.name().to_string(),
            property: Some(property),
        }
    }

    /// Returns the element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the property of a property element.
    #[must_use]
    pub fn as_property(&self) -> Option<&Arc<TypeProperty>> {
        self.property.as_ref()
    }
}
