//! Request and assembly processors.
//!
//! | Processor | Assembly | Role |
//! |-----------|----------|------|
//! | [`RoutingHandler`] | server | Branches into an assembly |
//! | [`RoutingByPathHandler`] | server | Branches the requests under a root URI |
//! | [`ParseFormDataHandler`] | resources | Turns form data into URL-encoded content |
//! | [`InvokingHandler`] | resources | Calls the request invoker |
//! | [`ProcessMethodHandler`] | assembler | Validates invokers per method |
//! | [`ModelPathAttributeEncode`] | encoder creation | Adds model `href` attributes |

pub mod formdata;
pub mod invoking;
pub mod model_path;
pub mod process_method;
pub mod routing;

pub use formdata::ParseFormDataHandler;
pub use invoking::InvokingHandler;
pub use model_path::{
    AttributeModelPath, Encoder, EncoderPathInvoker, ModelEncoder, ModelPathAttributeEncode,
    PathEncoder, Specifications, Specifier,
};
pub use process_method::ProcessMethodHandler;
pub use routing::{RoutingByPathHandler, RoutingHandler};
