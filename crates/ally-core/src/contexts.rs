//! Attribute declarations of the shared contexts.
//!
//! Processors in different crates cooperate through these attributes, so
//! they must agree on names and types. Contexts used by a single processor
//! are declared next to it.

use ally_design::{Attribute, ContextSpec, SharedContext};

/// The request argument context.
pub mod request {
    use super::*;
    use crate::api::Arguments;

    /// The context name.
    pub const CONTEXT: &str = "request";

    /// The request path, relative to the server root.
    pub const URI: Attribute<String> = Attribute::new("uri");
    /// The invoker resolved for the request.
    pub const INVOKER: Attribute<SharedContext> = Attribute::new("invoker");
    /// The arguments decoded for the invoker.
    pub const ARGUMENTS: Attribute<Arguments> = Attribute::new("arguments");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::argument(CONTEXT)
    }
}

/// The response argument context.
pub mod response {
    use super::*;
    use crate::render::Object;
    use serde_json::Value;

    /// The context name.
    pub const CONTEXT: &str = "response";

    /// The response code name, see [`crate::codes`].
    pub const CODE: Attribute<String> = Attribute::new("code");
    /// The HTTP status.
    pub const STATUS: Attribute<u16> = Attribute::new("status");
    /// False once the response is in error.
    pub const IS_SUCCESS: Attribute<bool> = Attribute::new("is_success");
    /// Error messages for the caller.
    pub const ERROR_MESSAGES: Attribute<Vec<String>> = Attribute::new("error_messages");
    /// Structured error details.
    pub const ERROR_DETAILS: Attribute<Object> = Attribute::new("error_details");
    /// The response object.
    pub const OBJ: Attribute<Value> = Attribute::new("obj");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::argument(CONTEXT)
    }

    /// Returns the declaration of a processor that sets codes.
    #[must_use]
    pub fn coded() -> ContextSpec {
        spec().defines(&CODE).defines(&STATUS).defines(&IS_SUCCESS)
    }

    /// Returns the declaration of a processor that sets codes and errors.
    #[must_use]
    pub fn coded_error() -> ContextSpec {
        coded().defines(&ERROR_MESSAGES)
    }
}

/// The request content argument context.
///
/// For multipart requests the context holds the current part, linked to the
/// multipart content through `previous_content`; further parts are fetched
/// one at a time.
pub mod request_content {
    use super::*;
    use bytes::Bytes;
    use indexmap::IndexMap;
    use std::sync::Arc;

    /// Fetches the next content part.
    pub type FetchNext = Arc<dyn Fn() -> Option<SharedContext> + Send + Sync>;

    /// The context name.
    pub const CONTEXT: &str = "request_content";

    /// The content type.
    pub const TYPE: Attribute<String> = Attribute::new("type");
    /// The content character set.
    pub const CHAR_SET: Attribute<String> = Attribute::new("char_set");
    /// The content disposition.
    pub const DISPOSITION: Attribute<String> = Attribute::new("disposition");
    /// The content disposition attributes.
    pub const DISPOSITION_ATTR: Attribute<IndexMap<String, String>> =
        Attribute::new("disposition_attr");
    /// The content bytes.
    pub const SOURCE: Attribute<Bytes> = Attribute::new("source");
    /// The content this part belongs to.
    pub const PREVIOUS_CONTENT: Attribute<SharedContext> = Attribute::new("previous_content");
    /// Fetches the part after this one.
    pub const FETCH_NEXT: Attribute<FetchNext> = Attribute::new("fetch_next");
    /// The file name of a file part.
    pub const NAME: Attribute<String> = Attribute::new("name");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::argument(CONTEXT)
    }

    /// Returns the declaration of a decoder that defines content parts.
    #[must_use]
    pub fn decoded() -> ContextSpec {
        spec()
            .defines(&TYPE)
            .defines(&CHAR_SET)
            .defines(&DISPOSITION)
            .defines(&DISPOSITION_ATTR)
            .defines(&SOURCE)
            .defines(&PREVIOUS_CONTENT)
            .defines(&FETCH_NEXT)
    }
}

/// The response content argument context.
pub mod response_content {
    use super::*;
    use bytes::Bytes;

    /// The context name.
    pub const CONTEXT: &str = "response_content";

    /// The content bytes.
    pub const SOURCE: Attribute<Bytes> = Attribute::new("source");
    /// The content type.
    pub const TYPE: Attribute<String> = Attribute::new("type");
    /// The content length.
    pub const LENGTH: Attribute<u64> = Attribute::new("length");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::argument(CONTEXT)
    }
}

/// The nested invoker context.
///
/// One invoker exists per exposed service call. It is registered at
/// assembly time and selected per request.
pub mod invoker {
    use super::*;
    use crate::api::{ApiType, Call, Element, Input, Invoke, Method, Prepare, TypeModel};
    use std::sync::Arc;

    /// The context name.
    pub const CONTEXT: &str = "Invoker";

    /// The call method.
    pub const METHOD: Attribute<Method> = Attribute::new("method");
    /// The call inputs.
    pub const INPUTS: Attribute<Vec<Input>> = Attribute::new("inputs");
    /// The call output.
    pub const OUTPUT: Attribute<ApiType> = Attribute::new("output");
    /// The callable.
    pub const INVOKE: Attribute<Arc<dyn Invoke>> = Attribute::new("invoke");
    /// The call description.
    pub const CALL: Attribute<Arc<Call>> = Attribute::new("call");
    /// Adjusts the arguments before binding.
    pub const PREPARE: Attribute<Prepare> = Attribute::new("prepare");
    /// Where the invoker was declared, used in messages.
    pub const LOCATION: Attribute<String> = Attribute::new("location");
    /// The path elements the invoker is exposed under.
    pub const PATH: Attribute<Vec<Element>> = Attribute::new("path");
    /// The model the invoker works on.
    pub const TARGET: Attribute<Arc<TypeModel>> = Attribute::new("target");
    /// True if the invoker returns a collection.
    pub const IS_COLLECTION: Attribute<bool> = Attribute::new("is_collection");
    /// True if the invoker returns whole models.
    pub const IS_MODEL: Attribute<bool> = Attribute::new("is_model");
    /// The invoker getting one model of the target.
    pub const INVOKER_GET: Attribute<SharedContext> = Attribute::new("invoker_get");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::nested(CONTEXT)
    }

    /// Returns the declaration of a registry that defines invokers.
    #[must_use]
    pub fn registered() -> ContextSpec {
        spec()
            .defines(&METHOD)
            .defines(&INPUTS)
            .defines(&OUTPUT)
            .defines(&INVOKE)
            .defines(&CALL)
            .defines(&PREPARE)
            .defines(&LOCATION)
            .defines(&PATH)
    }
}

/// The register argument context, used while assembling.
pub mod register {
    use super::*;

    /// The context name.
    pub const CONTEXT: &str = "register";

    /// The registered invokers.
    pub const INVOKERS: Attribute<Vec<SharedContext>> = Attribute::new("invokers");

    /// Returns an empty declaration of the context.
    #[must_use]
    pub fn spec() -> ContextSpec {
        ContextSpec::argument(CONTEXT)
    }
}
