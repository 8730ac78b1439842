//! Resolved, executable assemblies.
//!
//! A [`Processing`] is an [`Assembly`] whose context declarations have been
//! resolved. Building one fails early if any processor requires an attribute
//! nobody defines, so a processing that exists can always be executed.
//!
//! # Example
//!
//! ```
//! use ally_design::attribute::Attribute;
//! use ally_design::assembly::Assembly;
//! use ally_design::context::{ContextSpec, Contexts};
//! use ally_design::processing::Processing;
//! use ally_design::processor::FnProcessor;
//!
//! const URI: Attribute<String> = Attribute::new("uri");
//! const CODE: Attribute<u16> = Attribute::new("code");
//!
//! let mut assembly = Assembly::new("resources");
//! assembly
//!     .add(FnProcessor::new(
//!         "not_found",
//!         vec![
//!             ContextSpec::argument("request").requires(&URI),
//!             ContextSpec::argument("response").defines(&CODE),
//!         ],
//!         |chain| {
//!             chain.arg_mut("response")?.set(&CODE, 404)?;
//!             Ok(())
//!         },
//!     ))
//!     .unwrap();
//!
//! let processing = Processing::builder(&assembly)
//!     .source(ContextSpec::argument("request").defines(&URI))
//!     .source(ContextSpec::argument("response").requires(&CODE))
//!     .build()
//!     .unwrap();
//!
//! let mut request = processing.new_context("request").unwrap();
//! request.set(&URI, "/missing".to_string()).unwrap();
//!
//! let contexts = tokio_test::block_on(processing.execute(Contexts::new().with(request))).unwrap();
//! assert_eq!(contexts.get("response").unwrap().get(&CODE).unwrap(), Some(&404));
//! ```

use crate::assembly::Assembly;
use crate::chain::Chain;
use crate::context::{Context, ContextKind, ContextSchema, ContextSpec, Contexts};
use crate::error::{ChainError, ContextError, ResolveError};
use crate::processor::Processor;
use crate::resolver::{Listing, Resolvers, Schemas};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Owner name used for source declarations.
pub const SOURCE: &str = "<source>";

/// A resolved assembly ready for execution.
///
/// Cloning is cheap, all clones share the same processors and schemas.
#[derive(Clone)]
pub struct Processing {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    processors: Vec<Arc<dyn Processor>>,
    branches: Vec<Vec<Processing>>,
    schemas: Arc<Schemas>,
}

/// Builder for [`Processing`].
#[must_use]
pub struct ProcessingBuilder<'a> {
    assembly: &'a Assembly,
    sources: Vec<ContextSpec>,
}

impl ProcessingBuilder<'_> {
    /// Declares what the caller provides and reads back.
    ///
    /// Defined attributes are provided by the caller before execution,
    /// required attributes are expected in the returned contexts.
    pub fn source(mut self, spec: ContextSpec) -> Self {
        self.sources.push(spec);
        self
    }

    /// Declares several sources.
    pub fn sources(mut self, specs: impl IntoIterator<Item = ContextSpec>) -> Self {
        self.sources.extend(specs);
        self
    }

    /// Resolves the assembly.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if declarations conflict or a required attribute
    /// has no definer.
    pub fn build(self) -> Result<Processing, ResolveError> {
        let mut resolvers = Resolvers::new();
        for source in &self.sources {
            resolvers.merge(source, SOURCE)?;
        }
        merge_assembly(&mut resolvers, self.assembly)?;
        resolvers.validate()?;

        for (context, attribute) in resolvers.list(Listing::Unused) {
            debug!(
                processing = self.assembly.name(),
                context,
                attribute = attribute.name(),
                defined_by = ?attribute.defined_by(),
                "Attribute defined but never used"
            );
        }

        let schemas = Arc::new(resolvers.create());
        Ok(Processing::assemble(self.assembly, &schemas))
    }
}

fn merge_assembly(resolvers: &mut Resolvers, assembly: &Assembly) -> Result<(), ResolveError> {
    for processor in assembly.processors() {
        for spec in processor.contexts() {
            resolvers.merge(&spec, processor.name())?;
        }
        for branch in processor.branches() {
            merge_assembly(resolvers, &branch)?;
        }
    }
    Ok(())
}

impl Processing {
    /// Starts resolving an assembly.
    pub fn builder(assembly: &Assembly) -> ProcessingBuilder<'_> {
        ProcessingBuilder {
            assembly,
            sources: Vec::new(),
        }
    }

    fn assemble(assembly: &Assembly, schemas: &Arc<Schemas>) -> Self {
        let branches = assembly
            .processors()
            .iter()
            .map(|processor| {
                processor
                    .branches()
                    .iter()
                    .map(|branch| Self::assemble(branch, schemas))
                    .collect()
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                name: assembly.name().to_string(),
                processors: assembly.processors().to_vec(),
                branches,
                schemas: Arc::clone(schemas),
            }),
        }
    }

    /// Returns the assembly name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the processors in execution order.
    #[must_use]
    pub fn processors(&self) -> &[Arc<dyn Processor>] {
        &self.inner.processors
    }

    /// Returns branch `index` of the processor at `position`.
    #[must_use]
    pub fn branch(&self, position: usize, index: usize) -> Option<&Processing> {
        self.inner.branches.get(position)?.get(index)
    }

    /// Returns the resolved schemas.
    #[must_use]
    pub fn schemas(&self) -> &Schemas {
        &self.inner.schemas
    }

    /// Returns the resolved schema for a context name.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&Arc<ContextSchema>> {
        self.inner.schemas.get(name)
    }

    /// Creates an empty context for a context name.
    pub fn new_context(&self, name: &str) -> Result<Context, ContextError> {
        self.schema(name)
            .map(|schema| Context::new(Arc::clone(schema)))
            .ok_or_else(|| ContextError::UnknownContext(name.to_string()))
    }

    /// Completes the argument contexts.
    ///
    /// Missing argument contexts are added empty. Contexts bound to another
    /// schema are rebound to the resolved one, keeping the values the
    /// resolved schema accepts.
    pub fn fill_in(&self, mut contexts: Contexts) -> Result<Contexts, ContextError> {
        let mut filled = Contexts::new();
        let names: Vec<String> = contexts.names().map(str::to_string).collect();
        for name in names {
            let schema = self
                .schema(&name)
                .ok_or_else(|| ContextError::UnknownContext(name.clone()))?;
            if let Some(provided) = contexts.take(&name) {
                filled.insert(rebind(provided, schema));
            }
        }

        for (name, schema) in self.schemas() {
            if schema.kind() == ContextKind::Argument && !filled.contains(name) {
                filled.insert(Context::new(Arc::clone(schema)));
            }
        }
        Ok(filled)
    }

    /// Executes the processing over the argument contexts.
    ///
    /// # Errors
    ///
    /// Returns `ChainError` if the contexts do not fit the processing or a
    /// processor fails.
    pub async fn execute(&self, contexts: Contexts) -> Result<Contexts, ChainError> {
        let contexts = self.fill_in(contexts)?;
        Chain::new(self.clone(), contexts).execute().await
    }
}

fn rebind(context: Context, schema: &Arc<ContextSchema>) -> Context {
    if Arc::ptr_eq(context.schema(), schema) {
        return context;
    }
    let mut rebound = Context::new(Arc::clone(schema));
    for name in context.present() {
        if let Some(value) = context.raw(name) {
            // Values the resolved schema does not know are dropped.
            rebound.set_raw(name, value.clone_value());
        }
    }
    rebound
}

impl fmt::Debug for Processing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processing")
            .field("name", &self.inner.name)
            .field(
                "processors",
                &self
                    .inner
                    .processors
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field("contexts", &self.inner.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::error::ProcessError;
    use crate::processor::{BoxFuture, FnProcessor};

    const URI: Attribute<String> = Attribute::new("uri");
    const CODE: Attribute<u16> = Attribute::new("code");
    const TRACE: Attribute<bool> = Attribute::new("trace");

    fn responder() -> impl Processor {
        FnProcessor::new(
            "responder",
            vec![
                ContextSpec::argument("request").requires(&URI).optional(&TRACE),
                ContextSpec::argument("response").defines(&CODE),
            ],
            |chain| {
                let code = if chain.arg("request")?.require(&URI)? == "/" {
                    200
                } else {
                    404
                };
                chain.arg_mut("response")?.set(&CODE, code)?;
                Ok(())
            },
        )
    }

    #[test]
    fn test_build_reports_unavailable() {
        let mut assembly = Assembly::new("test");
        assembly.add(responder()).unwrap();

        let err = Processing::builder(&assembly).build().unwrap_err();
        match err {
            ResolveError::Unavailable(unavailable) => {
                assert_eq!(unavailable[0].attribute, "uri");
                assert_eq!(unavailable[0].required_by, ["responder"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_optional_without_definer_is_absent() {
        let mut assembly = Assembly::new("test");
        assembly.add(responder()).unwrap();
        let processing = Processing::builder(&assembly)
            .source(ContextSpec::argument("request").defines(&URI))
            .build()
            .unwrap();

        let request = processing.new_context("request").unwrap();
        assert!(request.has_attribute(&URI));
        assert!(!request.has_attribute(&TRACE));
        assert!(processing.new_context("missing").is_err());
    }

    #[tokio::test]
    async fn test_execute_rebinds_foreign_contexts() {
        let mut assembly = Assembly::new("test");
        assembly.add(responder()).unwrap();
        let processing = Processing::builder(&assembly)
            .source(ContextSpec::argument("request").defines(&URI))
            .build()
            .unwrap();

        let mut request = Context::from_spec(&ContextSpec::argument("request").defines(&URI));
        request.set(&URI, "/".to_string()).unwrap();

        let contexts = processing
            .execute(Contexts::new().with(request))
            .await
            .unwrap();
        assert_eq!(contexts.get("response").unwrap().get(&CODE).unwrap(), Some(&200));
    }

    #[tokio::test]
    async fn test_execute_rejects_unknown_context() {
        let mut assembly = Assembly::new("test");
        assembly.add(responder()).unwrap();
        let processing = Processing::builder(&assembly)
            .source(ContextSpec::argument("request").defines(&URI))
            .build()
            .unwrap();

        let other = Context::from_spec(&ContextSpec::argument("other"));
        let err = processing
            .execute(Contexts::new().with(other))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Context(ContextError::UnknownContext(_))));
    }

    struct Router {
        target: Assembly,
    }

    impl Processor for Router {
        fn name(&self) -> &str {
            "router"
        }

        fn contexts(&self) -> Vec<ContextSpec> {
            Vec::new()
        }

        fn branches(&self) -> Vec<Assembly> {
            vec![self.target.clone()]
        }

        fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
            Box::pin(async move {
                chain.branch(0).await?;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_branch_declarations_are_resolved() {
        let mut target = Assembly::new("target");
        target.add(responder()).unwrap();
        let mut assembly = Assembly::new("root");
        assembly.add(Router { target }).unwrap();

        assert!(Processing::builder(&assembly).build().is_err());

        let processing = Processing::builder(&assembly)
            .source(ContextSpec::argument("request").defines(&URI))
            .build()
            .unwrap();
        let mut request = processing.new_context("request").unwrap();
        request.set(&URI, "/x".to_string()).unwrap();

        let contexts = processing
            .execute(Contexts::new().with(request))
            .await
            .unwrap();
        assert_eq!(contexts.get("response").unwrap().get(&CODE).unwrap(), Some(&404));
    }
}
