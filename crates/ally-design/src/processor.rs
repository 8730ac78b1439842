//! The processor trait.
//!
//! A processor is one stage of an assembly. It declares the contexts it works
//! with through [`Processor::contexts`], and the engine makes sure every
//! required attribute has a definer before anything runs.
//!
//! # Example
//!
//! ```
//! use ally_design::attribute::Attribute;
//! use ally_design::chain::Chain;
//! use ally_design::context::ContextSpec;
//! use ally_design::error::ProcessError;
//! use ally_design::processor::{BoxFuture, Processor};
//!
//! const CODE: Attribute<u16> = Attribute::new("code");
//!
//! struct NotFound;
//!
//! impl Processor for NotFound {
//!     fn name(&self) -> &str {
//!         "not_found"
//!     }
//!
//!     fn contexts(&self) -> Vec<ContextSpec> {
//!         vec![ContextSpec::argument("response").defines(&CODE)]
//!     }
//!
//!     fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
//!         Box::pin(async move {
//!             chain.arg_mut("response")?.set(&CODE, 404)?;
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use crate::assembly::Assembly;
use crate::chain::Chain;
use crate::context::ContextSpec;
use crate::error::ProcessError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One stage of an assembly.
///
/// # Invariants
///
/// - Processors only touch attributes they declare
/// - A processor writing an attribute declares it as defined
/// - Branch indexes used with [`Chain::branch`] refer to [`Processor::branches`]
pub trait Processor: Send + Sync + 'static {
    /// Returns the processor name, unique within an assembly.
    fn name(&self) -> &str;

    /// Returns the context declarations.
    fn contexts(&self) -> Vec<ContextSpec>;

    /// Returns the assemblies this processor branches into.
    fn branches(&self) -> Vec<Assembly> {
        Vec::new()
    }

    /// Processes the chain contexts.
    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>>;
}

/// A processor built from a synchronous function.
///
/// ```
/// use ally_design::attribute::Attribute;
/// use ally_design::context::ContextSpec;
/// use ally_design::processor::{FnProcessor, Processor};
///
/// const CODE: Attribute<u16> = Attribute::new("code");
///
/// let processor = FnProcessor::new(
///     "ok",
///     vec![ContextSpec::argument("response").defines(&CODE)],
///     |chain| {
///         chain.arg_mut("response")?.set(&CODE, 200)?;
///         Ok(())
///     },
/// );
/// assert_eq!(processor.name(), "ok");
/// ```
pub struct FnProcessor<F> {
    name: String,
    contexts: Vec<ContextSpec>,
    func: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(&mut Chain) -> Result<(), ProcessError> + Send + Sync + 'static,
{
    /// Creates a new function based processor.
    pub fn new(name: impl Into<String>, contexts: Vec<ContextSpec>, func: F) -> Self {
        Self {
            name: name.into(),
            contexts,
            func,
        }
    }
}

impl<F> Processor for FnProcessor<F>
where
    F: Fn(&mut Chain) -> Result<(), ProcessError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        self.contexts.clone()
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move { (self.func)(chain) })
    }
}

impl<F> fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProcessor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
