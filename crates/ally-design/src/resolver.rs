//! Resolution of context declarations.
//!
//! Every processor of an assembly contributes [`ContextSpec`]s. The
//! [`Resolvers`] collect them per context name and per attribute, remembering
//! who requires, optionally uses and defines each attribute. Once everything
//! is merged, [`Resolvers::create`] produces the schemas the runtime contexts
//! are bound to.
//!
//! Requirement satisfaction does not depend on order: an attribute required by
//! the first processor is satisfied by a definer placed anywhere in the
//! pipeline, or by a source.

use crate::attribute::{AttributeSpec, Usage};
use crate::context::{ContextKind, ContextSchema, ContextSpec, SchemaAttribute};
use crate::error::{ResolveError, Unavailable};
use indexmap::IndexMap;
use std::any::TypeId;
use std::sync::Arc;

/// The resolved schemas of a processing, by context name.
pub type Schemas = IndexMap<String, Arc<ContextSchema>>;

/// Filters for [`Resolvers::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// Required attributes that nobody defines.
    Unavailable,
    /// Defined attributes that nobody requires or optionally uses.
    Unused,
    /// Attributes having at least one declaration with the usage.
    With(Usage),
}

/// The declarations of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeResolver {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    required_by: Vec<String>,
    optional_by: Vec<String>,
    defined_by: Vec<String>,
    docs: Vec<&'static str>,
}

impl AttributeResolver {
    fn new(spec: &AttributeSpec) -> Self {
        Self {
            name: spec.name(),
            type_id: spec.type_id(),
            type_name: spec.type_name(),
            required_by: Vec::new(),
            optional_by: Vec::new(),
            defined_by: Vec::new(),
            docs: Vec::new(),
        }
    }

    fn declare(&mut self, usage: Usage, owner: &str, doc: Option<&'static str>) {
        let owners = match usage {
            Usage::Required => &mut self.required_by,
            Usage::Optional => &mut self.optional_by,
            Usage::Defined => &mut self.defined_by,
        };
        if !owners.iter().any(|known| known == owner) {
            owners.push(owner.to_string());
        }
        if let Some(doc) = doc {
            if !self.docs.contains(&doc) {
                self.docs.push(doc);
            }
        }
    }

    fn absorb(&mut self, other: &AttributeResolver) {
        for (usage, owners) in [
            (Usage::Required, &other.required_by),
            (Usage::Optional, &other.optional_by),
            (Usage::Defined, &other.defined_by),
        ] {
            for owner in owners {
                self.declare(usage, owner, None);
            }
        }
        for doc in &other.docs {
            if !self.docs.contains(doc) {
                self.docs.push(doc);
            }
        }
    }

    /// Returns the attribute name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the value type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the owners requiring the attribute.
    #[must_use]
    pub fn required_by(&self) -> &[String] {
        &self.required_by
    }

    /// Returns the owners optionally using the attribute.
    #[must_use]
    pub fn optional_by(&self) -> &[String] {
        &self.optional_by
    }

    /// Returns the owners defining the attribute.
    #[must_use]
    pub fn defined_by(&self) -> &[String] {
        &self.defined_by
    }

    /// Returns true if somebody declares the attribute with the usage.
    #[must_use]
    pub fn has(&self, usage: Usage) -> bool {
        match usage {
            Usage::Required => !self.required_by.is_empty(),
            Usage::Optional => !self.optional_by.is_empty(),
            Usage::Defined => !self.defined_by.is_empty(),
        }
    }

    fn matches(&self, listing: Listing) -> bool {
        match listing {
            Listing::Unavailable => self.has(Usage::Required) && !self.has(Usage::Defined),
            Listing::Unused => {
                self.has(Usage::Defined)
                    && !self.has(Usage::Required)
                    && !self.has(Usage::Optional)
            }
            Listing::With(usage) => self.has(usage),
        }
    }
}

/// The declarations of one context name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextResolver {
    name: String,
    kind: ContextKind,
    attributes: IndexMap<&'static str, AttributeResolver>,
}

impl ContextResolver {
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

    /// Returns the attribute resolvers.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeResolver> {
        self.attributes.values()
    }

    /// Returns the resolver of one attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeResolver> {
        self.attributes.get(name)
    }

    fn check_kind(&self, kind: ContextKind, owner: &str) -> Result<(), ResolveError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(ResolveError::KindConflict {
                context: self.name.clone(),
                owner: owner.to_string(),
            })
        }
    }

    fn check_type(
        &self,
        name: &str,
        type_id: TypeId,
        type_name: &'static str,
        owner: &str,
    ) -> Result<(), ResolveError> {
        match self.attributes.get(name) {
            Some(known) if known.type_id != type_id => Err(ResolveError::IncompatibleType {
                context: self.name.clone(),
                attribute: name.to_string(),
                expected: known.type_name,
                found: type_name,
                owner: owner.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn schema(&self) -> ContextSchema {
        let attributes = self
            .attributes
            .values()
            .filter(|attribute| attribute.has(Usage::Defined) || attribute.has(Usage::Required))
            .map(|attribute| {
                (
                    attribute.name,
                    SchemaAttribute {
                        type_id: attribute.type_id,
                        type_name: attribute.type_name,
                        docs: attribute.docs.clone(),
                    },
                )
            })
            .collect();
        ContextSchema::new(self.name.clone(), self.kind, attributes)
    }
}

/// Context resolvers by context name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolvers {
    contexts: IndexMap<String, ContextResolver>,
}

impl Resolvers {
    /// Creates empty resolvers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one declaration made by `owner`.
    ///
    /// A failed merge leaves the resolvers untouched.
    pub fn merge(&mut self, spec: &ContextSpec, owner: &str) -> Result<(), ResolveError> {
        if let Some(known) = self.contexts.get(spec.name()) {
            known.check_kind(spec.kind(), owner)?;
            for attribute in spec.attributes() {
                known.check_type(
                    attribute.name(),
                    attribute.type_id(),
                    attribute.type_name(),
                    owner,
                )?;
            }
        }

        let context = self
            .contexts
            .entry(spec.name().to_string())
            .or_insert_with(|| ContextResolver {
                name: spec.name().to_string(),
                kind: spec.kind(),
                attributes: IndexMap::new(),
            });
        for attribute in spec.attributes() {
            context
                .attributes
                .entry(attribute.name())
                .or_insert_with(|| AttributeResolver::new(attribute))
                .declare(attribute.usage(), owner, attribute.documentation());
        }
        Ok(())
    }

    /// Merges every declaration of another set of resolvers.
    pub fn solve(&mut self, other: &Resolvers) -> Result<(), ResolveError> {
        for context in other.contexts.values() {
            if let Some(known) = self.contexts.get(&context.name) {
                let owner = first_owner(context);
                known.check_kind(context.kind, owner)?;
                for attribute in context.attributes.values() {
                    known.check_type(attribute.name, attribute.type_id, attribute.type_name, owner)?;
                }
            }
        }

        for context in other.contexts.values() {
            let target = self
                .contexts
                .entry(context.name.clone())
                .or_insert_with(|| ContextResolver {
                    name: context.name.clone(),
                    kind: context.kind,
                    attributes: IndexMap::new(),
                });
            for attribute in context.attributes.values() {
                target
                    .attributes
                    .entry(attribute.name)
                    .or_insert_with(|| AttributeResolver {
                        required_by: Vec::new(),
                        optional_by: Vec::new(),
                        defined_by: Vec::new(),
                        docs: Vec::new(),
                        ..attribute.clone()
                    })
                    .absorb(attribute);
            }
        }
        Ok(())
    }

    /// Returns resolvers restricted to the given context names.
    #[must_use]
    pub fn copy(&self, names: &[&str]) -> Self {
        Self {
            contexts: self
                .contexts
                .iter()
                .filter(|(name, _)| names.contains(&name.as_str()))
                .map(|(name, context)| (name.clone(), context.clone()))
                .collect(),
        }
    }

    /// Lists `(context, attribute)` pairs matching the filter.
    #[must_use]
    pub fn list(&self, listing: Listing) -> Vec<(&str, &AttributeResolver)> {
        self.contexts
            .values()
            .flat_map(|context| {
                context
                    .attributes
                    .values()
                    .filter(move |attribute| attribute.matches(listing))
                    .map(move |attribute| (context.name.as_str(), attribute))
            })
            .collect()
    }

    /// Fails if any required attribute has no definer.
    pub fn validate(&self) -> Result<(), ResolveError> {
        let unavailable: Vec<Unavailable> = self
            .list(Listing::Unavailable)
            .into_iter()
            .map(|(context, attribute)| Unavailable {
                context: context.to_string(),
                attribute: attribute.name.to_string(),
                required_by: attribute.required_by.clone(),
            })
            .collect();
        if unavailable.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::Unavailable(unavailable))
        }
    }

    /// Returns the resolver of a context name.
    #[must_use]
    pub fn context(&self, name: &str) -> Option<&ContextResolver> {
        self.contexts.get(name)
    }

    /// Returns the context names in first declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    /// Creates one schema per context name.
    ///
    /// Attributes only declared as optional are left out since nobody
    /// provides them.
    #[must_use]
    pub fn create(&self) -> Schemas {
        self.contexts
            .iter()
            .map(|(name, context)| (name.clone(), Arc::new(context.schema())))
            .collect()
    }
}

fn first_owner(context: &ContextResolver) -> &str {
    context
        .attributes
        .values()
        .flat_map(|attribute| {
            attribute
                .defined_by
                .iter()
                .chain(&attribute.required_by)
                .chain(&attribute.optional_by)
        })
        .map(String::as_str)
        .next()
        .unwrap_or("<unknown>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use proptest::prelude::*;

    const URI: Attribute<String> = Attribute::new("uri");
    const CODE: Attribute<u16> = Attribute::new("code");
    const CODE_TEXT: Attribute<String> = Attribute::new("code");
    const TEXT: Attribute<String> = Attribute::new("text");
    const TRACE: Attribute<bool> = Attribute::new("trace");

    #[test]
    fn test_requirement_satisfied_by_later_definer() {
        let mut resolvers = Resolvers::new();
        resolvers
            .merge(&ContextSpec::argument("request").requires(&URI), "routing")
            .unwrap();
        resolvers
            .merge(&ContextSpec::argument("request").defines(&URI), "parser")
            .unwrap();
        assert!(resolvers.validate().is_ok());
    }

    #[test]
    fn test_unavailable_lists_requirers() {
        let mut resolvers = Resolvers::new();
        resolvers
            .merge(&ContextSpec::argument("request").requires(&URI), "routing")
            .unwrap();
        resolvers
            .merge(&ContextSpec::argument("request").requires(&URI), "invoking")
            .unwrap();

        match resolvers.validate().unwrap_err() {
            ResolveError::Unavailable(unavailable) => {
                assert_eq!(unavailable.len(), 1);
                assert_eq!(unavailable[0].required_by, ["routing", "invoking"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_incompatible_type() {
        let mut resolvers = Resolvers::new();
        resolvers
            .merge(&ContextSpec::argument("response").defines(&CODE), "a")
            .unwrap();
        let err = resolvers
            .merge(&ContextSpec::argument("response").requires(&CODE_TEXT), "b")
            .unwrap_err();
        assert!(matches!(err, ResolveError::IncompatibleType { ref owner, .. } if owner == "b"));
    }

    #[test]
    fn test_kind_conflict() {
        let mut resolvers = Resolvers::new();
        resolvers
            .merge(&ContextSpec::argument("Invoker").defines(&URI), "a")
            .unwrap();
        let err = resolvers
            .merge(&ContextSpec::nested("Invoker").requires(&URI), "b")
            .unwrap_err();
        assert!(matches!(err, ResolveError::KindConflict { .. }));
    }

    #[test]
    fn test_listing() {
        let mut resolvers = Resolvers::new();
        resolvers
            .merge(
                &ContextSpec::argument("response")
                    .defines(&CODE)
                    .defines(&TEXT)
                    .optional(&TRACE),
                "a",
            )
            .unwrap();
        resolvers
            .merge(&ContextSpec::argument("response").requires(&CODE), "b")
            .unwrap();

        let unused: Vec<&str> = resolvers
            .list(Listing::Unused)
            .into_iter()
            .map(|(_, attribute)| attribute.name())
            .collect();
        assert_eq!(unused, ["text"]);

        let optional = resolvers.list(Listing::With(Usage::Optional));
        assert_eq!(optional.len(), 1);
        assert_eq!(optional[0].0, "response");
    }

    #[test]
    fn test_create_drops_optional_only() {
        let mut resolvers = Resolvers::new();
        resolvers
            .merge(
                &ContextSpec::argument("response").defines(&CODE).optional(&TRACE),
                "a",
            )
            .unwrap();
        resolvers
            .merge(&ContextSpec::placeholder("Empty", ContextKind::Nested), "b")
            .unwrap();

        let schemas = resolvers.create();
        let response = &schemas["response"];
        assert!(response.has_attribute("code"));
        assert!(!response.has_attribute("trace"));
        assert!(schemas["Empty"].is_empty());
    }

    #[test]
    fn test_solve_and_copy() {
        let mut first = Resolvers::new();
        first
            .merge(&ContextSpec::argument("request").requires(&URI), "a")
            .unwrap();
        let mut second = Resolvers::new();
        second
            .merge(&ContextSpec::argument("request").defines(&URI), "b")
            .unwrap();
        second
            .merge(&ContextSpec::argument("response").defines(&CODE), "b")
            .unwrap();

        first.solve(&second).unwrap();
        let uri = first.context("request").unwrap().attribute("uri").unwrap();
        assert_eq!(uri.defined_by(), ["b"]);
        assert_eq!(uri.required_by(), ["a"]);

        let copy = first.copy(&["response"]);
        assert_eq!(copy.names().collect::<Vec<_>>(), ["response"]);
    }

    fn declaration(index: u8) -> (ContextSpec, String) {
        let spec = match index % 4 {
            0 => ContextSpec::argument("request").requires(&URI),
            1 => ContextSpec::argument("request").defines(&URI),
            2 => ContextSpec::argument("response").defines(&CODE).optional(&TRACE),
            _ => ContextSpec::argument("response").requires(&CODE).defines(&TEXT),
        };
        (spec, format!("p{index}"))
    }

    proptest! {
        #[test]
        fn merge_order_does_not_change_schemas(mut indexes in prop::collection::vec(0_u8..8, 1..12)) {
            let mut forward = Resolvers::new();
            for (spec, owner) in indexes.iter().copied().map(declaration) {
                forward.merge(&spec, &owner).unwrap();
            }
            indexes.reverse();
            let mut backward = Resolvers::new();
            for (spec, owner) in indexes.iter().copied().map(declaration) {
                backward.merge(&spec, &owner).unwrap();
            }

            let names = |resolvers: &Resolvers, listing| {
                let mut names: Vec<String> = resolvers
                    .list(listing)
                    .into_iter()
                    .map(|(context, attribute)| format!("{context}.{}", attribute.name()))
                    .collect();
                names.sort();
                names
            };
            prop_assert_eq!(names(&forward, Listing::Unavailable), names(&backward, Listing::Unavailable));
            prop_assert_eq!(names(&forward, Listing::Unused), names(&backward, Listing::Unused));

            let forward_schemas = forward.create();
            let backward_schemas = backward.create();
            for (name, schema) in &forward_schemas {
                let mut expected: Vec<_> = schema.attribute_names().collect();
                let mut found: Vec<_> = backward_schemas[name].attribute_names().collect();
                expected.sort_unstable();
                found.sort_unstable();
                prop_assert_eq!(expected, found);
            }
        }
    }
}
