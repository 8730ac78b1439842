//! Definition verifiers and value providers.
//!
//! Definitions are nested `Definition` contexts describing what a processor
//! can report, like the input errors of an invoker or the documentation of a
//! parameter. Verifiers select definitions, value providers extract data from
//! them. Both first [`Prepare`] the resolvers so that the attributes they read
//! become part of the resolved `Definition` schema.
//!
//! ```
//! use ally_core::definition::{self, select, Verifier, VerifyAll, VerifyCategory, VerifyName};
//! use ally_design::{share, Context, SharedContext};
//!
//! let make = |name: &str, category: &str| -> SharedContext {
//!     let mut context = Context::from_spec(&definition::declaration());
//!     context.set(&definition::NAME, name.to_string()).unwrap();
//!     context.set(&definition::CATEGORY, category.to_string()).unwrap();
//!     share(context)
//! };
//! let definitions = [make("limit", "option"), make("offset", "option"), make("id", "path")];
//!
//! let options = select(&definitions, &VerifyCategory::new("option"));
//! assert_eq!(options.len(), 2);
//!
//! let limit = VerifyAll::new(vec![
//!     Box::new(VerifyCategory::new("option")),
//!     Box::new(VerifyName::new("limit")),
//! ]);
//! assert_eq!(select(&definitions, &limit).len(), 1);
//! ```

use ally_design::{
    Attribute, Context, ContextSpec, ResolveError, Resolvers, SharedContext,
};
use serde_json::Value;
use std::fmt;

/// The context name.
pub const CONTEXT: &str = "Definition";

/// The definition name.
pub const NAME: Attribute<String> = Attribute::new("name");
/// The definition category.
pub const CATEGORY: Attribute<String> = Attribute::new("category");
/// Free text documentation.
pub const DESCRIPTION: Attribute<String> = Attribute::new("description");

/// Returns the declaration of a registry that defines definitions.
#[must_use]
pub fn declaration() -> ContextSpec {
    ContextSpec::nested(CONTEXT)
        .defines(&NAME)
        .defines(&CATEGORY)
        .defines(&DESCRIPTION)
}

/// Contributes declarations to the resolvers of a processing.
pub trait Prepare {
    /// Merges the declarations needed at run time.
    fn prepare(&self, resolvers: &mut Resolvers) -> Result<(), ResolveError>;
}

/// Decides whether a definition is selected.
pub trait Verifier: Prepare + Send + Sync {
    /// Returns true if the definition is valid.
    fn is_valid(&self, definition: &Context) -> bool;
}

/// Extracts a value from a definition.
pub trait ValueProvider: Prepare + Send + Sync {
    /// Returns the value of the definition.
    fn get(&self, definition: &Context) -> Option<Value>;
}

/// Selects the definitions a verifier accepts.
#[must_use]
pub fn select(definitions: &[SharedContext], verifier: &dyn Verifier) -> Vec<SharedContext> {
    definitions
        .iter()
        .filter(|definition| verifier.is_valid(&definition.read()))
        .cloned()
        .collect()
}

fn requires(resolvers: &mut Resolvers, attribute: &Attribute<String>, owner: &str) -> Result<(), ResolveError> {
    resolvers.merge(&ContextSpec::nested(CONTEXT).requires(attribute), owner)
}

fn matches(definition: &Context, attribute: &Attribute<String>, expected: &str) -> bool {
    matches!(definition.get(attribute), Ok(Some(value)) if value == expected)
}

/// Accepts the definitions with a name.
#[derive(Debug, Clone)]
pub struct VerifyName {
    name: String,
}

impl VerifyName {
    /// Creates the verifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Prepare for VerifyName {
    fn prepare(&self, resolvers: &mut Resolvers) -> Result<(), ResolveError> {
        requires(resolvers, &NAME, "verify_name")
    }
}

impl Verifier for VerifyName {
    fn is_valid(&self, definition: &Context) -> bool {
        matches(definition, &NAME, &self.name)
    }
}

/// Accepts the definitions of a category.
#[derive(Debug, Clone)]
pub struct VerifyCategory {
    category: String,
}

impl VerifyCategory {
    /// Creates the verifier.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }
}

impl Prepare for VerifyCategory {
    fn prepare(&self, resolvers: &mut Resolvers) -> Result<(), ResolveError> {
        requires(resolvers, &CATEGORY, "verify_category")
    }
}

impl Verifier for VerifyCategory {
    fn is_valid(&self, definition: &Context) -> bool {
        matches(definition, &CATEGORY, &self.category)
    }
}

/// Accepts the definitions every verifier accepts.
pub struct VerifyAll {
    verifiers: Vec<Box<dyn Verifier>>,
}

impl VerifyAll {
    /// Creates the verifier.
    #[must_use]
    pub fn new(verifiers: Vec<Box<dyn Verifier>>) -> Self {
        Self { verifiers }
    }
}

impl Prepare for VerifyAll {
    fn prepare(&self, resolvers: &mut Resolvers) -> Result<(), ResolveError> {
        self.verifiers
            .iter()
            .try_for_each(|verifier| verifier.prepare(resolvers))
    }
}

impl Verifier for VerifyAll {
    fn is_valid(&self, definition: &Context) -> bool {
        self.verifiers
            .iter()
            .all(|verifier| verifier.is_valid(definition))
    }
}

impl fmt::Debug for VerifyAll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyAll")
            .field("verifiers", &self.verifiers.len())
            .finish()
    }
}

/// Accepts the definitions at least one verifier accepts.
pub struct VerifyAny {
    verifiers: Vec<Box<dyn Verifier>>,
}

impl VerifyAny {
    /// Creates the verifier.
    #[must_use]
    pub fn new(verifiers: Vec<Box<dyn Verifier>>) -> Self {
        Self { verifiers }
    }
}

impl Prepare for VerifyAny {
    fn prepare(&self, resolvers: &mut Resolvers) -> Result<(), ResolveError> {
        self.verifiers
            .iter()
            .try_for_each(|verifier| verifier.prepare(resolvers))
    }
}

impl Verifier for VerifyAny {
    fn is_valid(&self, definition: &Context) -> bool {
        self.verifiers
            .iter()
            .any(|verifier| verifier.is_valid(definition))
    }
}

impl fmt::Debug for VerifyAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyAny")
            .field("verifiers", &self.verifiers.len())
            .finish()
    }
}

/// Provides the value of a text attribute.
#[derive(Debug, Clone, Copy)]
pub struct ValueOf {
    attribute: Attribute<String>,
}

impl ValueOf {
    /// Creates the provider.
    #[must_use]
    pub const fn new(attribute: Attribute<String>) -> Self {
        Self { attribute }
    }
}

impl Prepare for ValueOf {
    fn prepare(&self, resolvers: &mut Resolvers) -> Result<(), ResolveError> {
        resolvers.merge(
            &ContextSpec::nested(CONTEXT).optional(&self.attribute),
            "value_of",
        )
    }
}

impl ValueProvider for ValueOf {
    fn get(&self, definition: &Context) -> Option<Value> {
        definition
            .get(&self.attribute)
            .ok()
            .flatten()
            .map(|value| Value::String(value.clone()))
    }
}
