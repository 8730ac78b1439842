//! Model path attribute encoding.
//!
//! Encoders of models are built from specifiers: small pieces that each add
//! attributes to the encoded object. [`ModelPathAttributeEncode`] contributes
//! the specifier that renders the path of a model as its `href` attribute,
//! using the GET invoker of the model.
//!
//! ```text
//! create ──► ModelPathAttributeEncode ──► specifiers += AttributeModelPath
//!                                                          │
//! support { path_values, encoder_path_invoker } ──► href = "resources/User/7"
//! ```

use crate::contexts::invoker;
use crate::render::{Object, Render, Value as RenderValue};
use ally_design::prelude::*;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The index block of REST references.
pub const NAME_BLOCK_REST: &str = "rest";
/// The capture action of references.
pub const ACTION_REFERENCE: &str = "reference";

/// Specifications collected for an encoded object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specifications {
    /// Attributes of the encoded object.
    pub attributes: IndexMap<String, String>,
    /// The index block the object is rendered in.
    pub index_block: Option<String>,
    /// The capture action per attribute.
    pub index_attributes_capture: IndexMap<String, String>,
}

/// Populates the specifications of an encoded object.
pub trait Specifier: Send + Sync {
    /// Adds to the specifications of `obj`.
    fn populate(
        &self,
        obj: &Value,
        specifications: &mut Specifications,
        support: &Context,
    ) -> Result<(), ProcessError>;
}

/// Encodes objects into a render tree.
pub trait Encoder: Send + Sync {
    /// Renders `obj`.
    fn encode(&self, obj: &Value, support: &Context) -> Result<Render, ProcessError>;
}

/// Encodes the path of an invoker.
pub trait EncoderPathInvoker: Send + Sync {
    /// Returns the path of the invoker for the property values.
    fn encode(
        &self,
        invoker: &Context,
        path_values: &IndexMap<String, String>,
    ) -> Result<String, ProcessError>;
}

/// The encoder creation argument context.
pub mod create {
    use super::*;
    use ally_design::{Attribute, ContextSpec};

    /// The context name.
    pub const CONTEXT: &str = "create";

    /// The invoker whose output is encoded.
    pub const INVOKER: Attribute<SharedContext> = Attribute::new("invoker");
    /// The encoder, once one is created.
    pub const ENCODER: Attribute<Arc<dyn Encoder>> = Attribute::new("encoder");
    /// The specifiers of the encoder.
    pub const SPECIFIERS: Attribute<Vec<Arc<dyn Specifier>>> = Attribute::new("specifiers");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::argument(CONTEXT)
    }
}

/// The nested context given to encoders at render time.
pub mod support {
    use super::*;
    use ally_design::{Attribute, ContextSpec};

    /// The context name.
    pub const CONTEXT: &str = "Support";

    /// Property values keyed by `Parent.property`.
    pub const PATH_VALUES: Attribute<IndexMap<String, String>> = Attribute::new("path_values");
    /// Encodes invoker paths.
    pub const ENCODER_PATH_INVOKER: Attribute<Arc<dyn EncoderPathInvoker>> =
        Attribute::new("encoder_path_invoker");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::nested(CONTEXT)
    }
}

/// Adds the model path specifier for invokers with a GET-model invoker.
#[derive(Debug, Clone)]
pub struct ModelPathAttributeEncode {
    name_ref: String,
}

impl ModelPathAttributeEncode {
    /// Creates the processor with the `href` reference attribute.
    #[must_use]
    pub fn new() -> Self {
        Self::with_name_ref("href")
    }

    /// Creates the processor with a custom reference attribute.
    #[must_use]
    pub fn with_name_ref(name_ref: impl Into<String>) -> Self {
        Self {
            name_ref: name_ref.into(),
        }
    }
}

impl Default for ModelPathAttributeEncode {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for ModelPathAttributeEncode {
    fn name(&self) -> &str {
        "model_path_attribute_encode"
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![
            create::spec()
                .requires(&create::INVOKER)
                .optional(&create::ENCODER)
                .defines(&create::SPECIFIERS),
            invoker::spec().optional(&invoker::INVOKER_GET),
            support::spec()
                .requires(&support::PATH_VALUES)
                .requires(&support::ENCODER_PATH_INVOKER),
        ]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move { self.parse(chain) })
    }
}

impl ModelPathAttributeEncode {
    fn parse(&self, chain: &mut Chain) -> Result<(), ProcessError> {
        let context = chain.arg(create::CONTEXT)?;
        if context.get(&create::ENCODER)?.is_some() {
            return Ok(());
        }
        let invoker_get = {
            let shared = context.require(&create::INVOKER)?.read();
            match shared.get(&invoker::INVOKER_GET)? {
                Some(invoker_get) => invoker_get.clone(),
                None => return Ok(()),
            }
        };

        chain
            .arg_mut(create::CONTEXT)?
            .get_or_insert_with(&create::SPECIFIERS, Vec::new)?
            .push(Arc::new(AttributeModelPath::new(
                self.name_ref.clone(),
                invoker_get,
            )));
        Ok(())
    }
}

/// Renders the path of a model as a reference attribute.
pub struct AttributeModelPath {
    name_ref: String,
    invoker: SharedContext,
}

impl AttributeModelPath {
    /// Creates the specifier for the GET-model invoker.
    #[must_use]
    pub fn new(name_ref: impl Into<String>, invoker: SharedContext) -> Self {
        Self {
            name_ref: name_ref.into(),
            invoker,
        }
    }
}

impl Specifier for AttributeModelPath {
    fn populate(
        &self,
        _obj: &Value,
        specifications: &mut Specifications,
        support: &Context,
    ) -> Result<(), ProcessError> {
        let encoder = support.require(&support::ENCODER_PATH_INVOKER)?;
        let path_values = support.require(&support::PATH_VALUES)?;
        let path = encoder.encode(&self.invoker.read(), path_values)?;

        specifications
            .attributes
            .insert(self.name_ref.clone(), path);
        specifications.index_block = Some(NAME_BLOCK_REST.to_string());
        specifications
            .index_attributes_capture
            .insert(self.name_ref.clone(), ACTION_REFERENCE.to_string());
        Ok(())
    }
}

impl fmt::Debug for AttributeModelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeModelPath")
            .field("name_ref", &self.name_ref)
            .finish_non_exhaustive()
    }
}

/// Encodes invoker paths under a root URI.
#[derive(Debug, Clone)]
pub struct PathEncoder {
    root: String,
}

impl PathEncoder {
    /// Creates the encoder, `root` is prefixed to every path.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl EncoderPathInvoker for PathEncoder {
    fn encode(
        &self,
        invoker: &Context,
        path_values: &IndexMap<String, String>,
    ) -> Result<String, ProcessError> {
        let elements = invoker.require(&invoker::PATH)?;
        let mut path = Vec::with_capacity(elements.len());
        for element in elements {
            match element.as_property() {
                Some(property) => {
                    let key = format!("{}.{}", property.parent().name(), property.name());
                    let value = path_values.get(&key).ok_or_else(|| {
                        ProcessError::devel(format!("No value for path element '{key}'"))
                    })?;
                    path.push(value.as_str());
                }
                None => path.push(element.name()),
            }
        }
        Ok(format!("{}{}", self.root, path.join("/")))
    }
}

/// Encodes models as objects of their specified attributes and fields.
pub struct ModelEncoder {
    name: String,
    specifiers: Vec<Arc<dyn Specifier>>,
}

impl ModelEncoder {
    /// Creates the encoder.
    #[must_use]
    pub fn new(name: impl Into<String>, specifiers: Vec<Arc<dyn Specifier>>) -> Self {
        Self {
            name: name.into(),
            specifiers,
        }
    }
}

impl Encoder for ModelEncoder {
    fn encode(&self, obj: &Value, support: &Context) -> Result<Render, ProcessError> {
        let mut specifications = Specifications::default();
        for specifier in &self.specifiers {
            specifier.populate(obj, &mut specifications, support)?;
        }

        let mut object = Object::new(self.name.clone());
        for (name, value) in specifications.attributes {
            object.push(RenderValue::new(name, value));
        }
        if let Value::Object(fields) = obj {
            for (name, value) in fields {
                let text = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                object.push(RenderValue::new(name.clone(), text));
            }
        }
        Ok(object.into())
    }
}

impl fmt::Debug for ModelEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEncoder")
            .field("name", &self.name)
            .field("specifiers", &self.specifiers.len())
            .finish()
    }
}
