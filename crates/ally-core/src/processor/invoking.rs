//! The invoking processor.
//!
//! Calls the invoker selected for the request with the decoded arguments,
//! then maps the returned value onto the response according to the invoker
//! method.
//!
//! | Method | Output | Result | Response |
//! |--------|--------|--------|----------|
//! | GET | any | value | `obj` |
//! | INSERT | model id | null | INSERT_ERROR |
//! | INSERT | any | value | `obj`, INSERT_SUCCESS |
//! | UPDATE | None | - | UPDATE_SUCCESS |
//! | UPDATE | bool | true / false | UPDATE_SUCCESS / UPDATE_ERROR |
//! | UPDATE | any | value | `obj`, UPDATE_SUCCESS |
//! | DELETE | bool | true / false | DELETE_SUCCESS / DELETE_ERROR |
//! | DELETE | any | value | `obj`, DELETE_SUCCESS |
//!
//! An [`InputError`] raised by the call sets INPUT_ERROR with rendered error
//! details.

use crate::api::{
    is_model_id, ApiType, Arguments, Input, InputError, InvokeError, Method, Options,
};
use crate::codes::{
    is_failed, DELETE_ERROR, DELETE_SUCCESS, INPUT_ERROR, INSERT_ERROR, INSERT_SUCCESS,
    UPDATE_ERROR, UPDATE_SUCCESS,
};
use crate::contexts::{invoker, request, response};
use crate::render::{List, Object, Render, Value as RenderValue};
use ally_design::prelude::*;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Invokes the request invoker.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvokingHandler;

impl InvokingHandler {
    /// Creates the processor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Processor for InvokingHandler {
    fn name(&self) -> &str {
        "invoking"
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![
            request::spec()
                .requires(&request::INVOKER)
                .optional(&request::ARGUMENTS),
            response::coded()
                .defines(&response::OBJ)
                .defines(&response::ERROR_DETAILS),
            invoker::spec()
                .requires(&invoker::METHOD)
                .requires(&invoker::INPUTS)
                .requires(&invoker::OUTPUT)
                .requires(&invoker::LOCATION)
                .optional(&invoker::INVOKE)
                .optional(&invoker::CALL)
                .optional(&invoker::PREPARE),
        ]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            if is_failed(chain.arg(response::CONTEXT)?)? {
                return Ok(());
            }

            let req = chain.arg(request::CONTEXT)?;
            let shared = req.require(&request::INVOKER)?.clone();
            let mut arguments: Arguments = if req.has_attribute(&request::ARGUMENTS) {
                req.get(&request::ARGUMENTS)?.cloned().unwrap_or_default()
            } else {
                Arguments::new()
            };

            let (invoke, method, output, location, args, options) = {
                let context = shared.read();
                let invoke = match context.get(&invoker::INVOKE)? {
                    Some(invoke) if context.contains(&invoker::CALL) => invoke.clone(),
                    _ => return Ok(()),
                };
                if let Some(prepare) = context.get(&invoker::PREPARE)? {
                    prepare(&mut arguments);
                }
                let location = context.require(&invoker::LOCATION)?.clone();
                let (args, options) =
                    bind(context.require(&invoker::INPUTS)?, &arguments, &location)?;
                (
                    invoke,
                    *context.require(&invoker::METHOD)?,
                    context.require(&invoker::OUTPUT)?.clone(),
                    location,
                    args,
                    options,
                )
            };

            let result = invoke.invoke(args, options).await;
            let resp = chain.arg_mut(response::CONTEXT)?;
            match result {
                Ok(value) => {
                    debug!(%location, %method, "Successful on calling invoker");
                    after(method, &output, value, resp, &location)
                }
                Err(InvokeError::Input(error)) => {
                    debug!(%location, %error, "User input exception");
                    INPUT_ERROR.set(resp)?;
                    resp.set(&response::ERROR_DETAILS, input_error_details(&error))?;
                    Ok(())
                }
                Err(InvokeError::Other(error)) => Err(ProcessError::Other(error)),
            }
        })
    }
}

/// Binds the arguments to the inputs.
///
/// Each input takes the argument with its name, else the argument with its
/// type name. Options are bound as keyword arguments, the others
/// positionally. Unbound inputs take their default; an unbound option without
/// default is left out.
pub fn bind(
    inputs: &[Input],
    arguments: &Arguments,
    location: &str,
) -> Result<(Vec<Value>, Options), ProcessError> {
    let mut args = Vec::with_capacity(inputs.len());
    let mut options = Options::new();
    for input in inputs {
        let value = arguments
            .get(input.name())
            .or_else(|| arguments.get(&input.kind().to_string()))
            .cloned();

        match (value, input.is_option()) {
            (Some(value), true) => {
                options.insert(input.name().to_string(), value);
            }
            (Some(value), false) => args.push(value),
            (None, true) => {
                if let Some(default) = input.default() {
                    options.insert(input.name().to_string(), default.clone());
                }
            }
            (None, false) => match input.default() {
                Some(default) => args.push(default.clone()),
                None => {
                    return Err(ProcessError::devel(format!(
                        "No value for mandatory input '{}', at:{}",
                        input.name(),
                        location
                    )))
                }
            },
        }
    }
    Ok((args, options))
}

fn after(
    method: Method,
    output: &ApiType,
    value: Value,
    response: &mut Context,
    location: &str,
) -> Result<(), ProcessError> {
    if !output.is_valid(&value) {
        return Err(ProcessError::devel(format!(
            "Invalid return value '{value}' for output {output}, at:{location}"
        )));
    }

    match method {
        Method::Get => {
            response.set(&response::OBJ, value)?;
        }
        Method::Insert => {
            if is_model_id(output) && value.is_null() {
                INSERT_ERROR.set(response)?;
                debug!(%location, "Cannot insert resource");
                return Ok(());
            }
            response.set(&response::OBJ, value)?;
            INSERT_SUCCESS.set(response)?;
        }
        Method::Update => {
            if output.is_of(&ApiType::None) {
                UPDATE_SUCCESS.set(response)?;
            } else if output.is_of(&ApiType::Boolean) {
                if value == Value::Bool(true) {
                    UPDATE_SUCCESS.set(response)?;
                } else {
                    UPDATE_ERROR.set(response)?;
                    debug!(%location, "Cannot update resource");
                }
            } else {
                UPDATE_SUCCESS.set(response)?;
                response.set(&response::OBJ, value)?;
            }
        }
        Method::Delete => {
            if output.is_of(&ApiType::Boolean) {
                if value == Value::Bool(true) {
                    DELETE_SUCCESS.set(response)?;
                } else {
                    DELETE_ERROR.set(response)?;
                    debug!(%location, "Cannot delete resource");
                }
            } else {
                DELETE_SUCCESS.set(response)?;
                response.set(&response::OBJ, value)?;
            }
        }
    }
    Ok(())
}

/// Renders an input error as error details.
///
/// General messages go in an `error` list. Messages about a model are
/// grouped in an object named after the model, with an `error` list for the
/// model messages and one value per property message.
#[must_use]
pub fn input_error_details(error: &InputError) -> Object {
    let mut general = Vec::new();
    let mut models: IndexMap<&str, (Vec<Render>, Vec<Render>)> = IndexMap::new();
    for message in error.messages() {
        match (&message.model, &message.property) {
            (None, _) => general.push(RenderValue::new("message", &message.message).into()),
            (Some(model), None) => models
                .entry(model.as_str())
                .or_default()
                .0
                .push(RenderValue::new("message", &message.message).into()),
            (Some(model), Some(property)) => models
                .entry(model.as_str())
                .or_default()
                .1
                .push(RenderValue::new(property, &message.message).into()),
        }
    }

    let mut details = Object::new("model");
    if !general.is_empty() {
        details.push(List::new("error", general));
    }
    for (name, (messages, properties)) in models {
        let mut model = Object::new(name);
        if !messages.is_empty() {
            model.push(List::new("error", messages));
        }
        for property in properties {
            model.push(property);
        }
        details.push(model);
    }
    details
}
