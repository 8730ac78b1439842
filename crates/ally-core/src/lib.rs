//! # Ally Core
//!
//! Core types and request processors of the ally framework.
//!
//! This crate provides what the processor chains of an application share:
//!
//! - [`api`] - Service call descriptions: methods, types, inputs, invokers
//! - [`contexts`] - The attributes of the request, response and invoker contexts
//! - [`codes`] - Response codes and their HTTP status
//! - [`render`] - The render tree of structured response details
//! - [`definition`] - Verifiers and value providers over definitions
//! - [`processor`] - Routing, decoding, invoking and assembling processors
//! - [`assembler`] - Invoker registration with abort handling
//! - [`Container`] - Dependency injection of services and named entities
//! - [`AllyError`] - Standard error type
//!
//! ## Request pipeline
//!
//! ```text
//! request ──► routing_by_path ──► parse_form_data ──► invoking ──► response
//!                 │
//!                 └─ content router (cdm)
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod assembler;
pub mod codes;
pub mod contexts;
pub mod definition;
mod di;
mod error;
pub mod processor;
pub mod render;

pub use assembler::register_invokers;
pub use di::{Container, Inject, InjectionError};
pub use error::{AllyError, AllyResult, ErrorCategory};

/// Convenient imports for writing request processors.
pub mod prelude {
    pub use crate::api::{ApiType, Arguments, Input, InputError, Method, Ref, TypeModel};
    pub use crate::codes::{add_error, is_failed, Code};
    pub use crate::contexts::{invoker, register, request, request_content, response};
    pub use crate::error::{AllyError, AllyResult};
    pub use crate::processor::{
        InvokingHandler, ParseFormDataHandler, ProcessMethodHandler, RoutingByPathHandler,
        RoutingHandler,
    };
}
