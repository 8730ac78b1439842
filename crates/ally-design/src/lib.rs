//! # Ally Design
//!
//! The processor-chain execution engine of the ally framework.
//!
//! An application is made of assemblies: ordered lists of processors. Each
//! processor declares, per named context, which typed attributes it
//! *requires*, *defines* or *optionally* uses. Before any request is served
//! the declarations are resolved into one schema per context name, and
//! missing definers are reported up front.
//!
//! ## Flow
//!
//! ```text
//! Assembly ──► Processing::builder ──► Resolvers ──► Schemas
//!                                                      │
//! Contexts ──► Processing::execute ──► Chain ──► processor 1 ──► ... ──► Contexts
//!                                                  │
//!                                                  └─ branch(i) ──► sub-processing
//! ```
//!
//! ## Key Concepts
//!
//! | Concept | Type | Role |
//! |---------|------|------|
//! | Attribute | [`Attribute`] | Typed key of a context value |
//! | Declaration | [`ContextSpec`] | What a processor does with a context |
//! | Schema | [`ContextSchema`] | Resolved attributes of a context name |
//! | Processor | [`Processor`] | One stage of an assembly |
//! | Processing | [`Processing`] | A resolved, executable assembly |
//! | Chain | [`Chain`] | One execution of a processing |
//! | Abort | [`Abort`] | Stops processing with reasons |
//!
//! ## Example
//!
//! ```
//! use ally_design::prelude::*;
//!
//! const NAME: Attribute<String> = Attribute::new("name");
//! const GREETING: Attribute<String> = Attribute::new("greeting");
//!
//! let mut assembly = Assembly::new("greet");
//! assembly
//!     .add(FnProcessor::new(
//!         "greeter",
//!         vec![ContextSpec::argument("data").requires(&NAME).defines(&GREETING)],
//!         |chain| {
//!             let data = chain.arg_mut("data")?;
//!             let greeting = format!("Hello {}", data.require(&NAME)?);
//!             data.set(&GREETING, greeting)?;
//!             Ok(())
//!         },
//!     ))
//!     .unwrap();
//!
//! let processing = Processing::builder(&assembly)
//!     .source(ContextSpec::argument("data").defines(&NAME).requires(&GREETING))
//!     .build()
//!     .unwrap();
//!
//! let mut data = processing.new_context("data").unwrap();
//! data.set(&NAME, "ally".to_string()).unwrap();
//! let contexts = tokio_test::block_on(processing.execute(Contexts::new().with(data))).unwrap();
//!
//! let greeting = contexts.get("data").unwrap().get(&GREETING).unwrap();
//! assert_eq!(greeting.map(String::as_str), Some("Hello ally"));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assembly;
pub mod attribute;
pub mod chain;
pub mod context;
pub mod error;
pub mod processing;
pub mod processor;
pub mod resolver;
pub mod support;

pub use assembly::Assembly;
pub use attribute::{Attribute, AttributeSpec, Usage};
pub use chain::Chain;
pub use context::{share, Context, ContextKind, ContextSchema, ContextSpec, Contexts, SharedContext};
pub use error::{Abort, AssemblyError, ChainError, ContextError, ProcessError, ResolveError};
pub use processing::{Processing, ProcessingBuilder};
pub use processor::{BoxFuture, FnProcessor, Processor};
pub use resolver::{Listing, Resolvers, Schemas};

/// Convenient imports for writing processors.
pub mod prelude {
    pub use crate::assembly::Assembly;
    pub use crate::attribute::Attribute;
    pub use crate::chain::Chain;
    pub use crate::context::{share, Context, ContextSpec, Contexts, SharedContext};
    pub use crate::error::{Abort, ProcessError};
    pub use crate::processing::Processing;
    pub use crate::processor::{BoxFuture, FnProcessor, Processor};
}
