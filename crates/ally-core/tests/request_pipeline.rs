//! Request pipeline integration tests.
//!
//! Invokers are registered through the assembler processing, then served by
//! a server processing:
//!
//! 1. Routing by path - Strips the `resources` root
//! 2. Find invoker - Matches the URI against the invoker paths
//! 3. Invoking - Calls the invoker and sets the response

use ally_core::api::{invoke_fn, Call, Element, InputError, InvokeError, TypeProperty};
use ally_core::codes::{NOT_FOUND, UPDATE_SUCCESS};
use ally_core::prelude::*;
use ally_core::register_invokers;
use ally_design::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn user() -> Arc<TypeModel> {
    Arc::new(TypeModel::new("User").with_id("Id"))
}

fn declare(
    location: &str,
    method: Method,
    inputs: Vec<Input>,
    output: ApiType,
    path: Vec<Element>,
    invoke: Arc<dyn ally_core::api::Invoke>,
) -> Context {
    let mut context = Context::from_spec(&invoker::registered());
    let call = Call {
        name: location.to_string(),
        method,
        inputs: inputs.clone(),
        output: output.clone(),
    };
    context.set(&invoker::METHOD, method).unwrap();
    context.set(&invoker::INPUTS, inputs).unwrap();
    context.set(&invoker::OUTPUT, output).unwrap();
    context.set(&invoker::CALL, Arc::new(call)).unwrap();
    context.set(&invoker::INVOKE, invoke).unwrap();
    context.set(&invoker::LOCATION, location.to_string()).unwrap();
    context.set(&invoker::PATH, path).unwrap();
    context
}

async fn invokers() -> Vec<SharedContext> {
    let user = user();
    let id = Arc::new(TypeProperty::of_model(&user, "Id", ApiType::Integer));
    let id_type = ApiType::Property(Arc::clone(&id));

    let get_user = declare(
        "users.get",
        Method::Get,
        vec![Input::new("Id", id_type.clone())],
        ApiType::Model(Arc::clone(&user)),
        vec![Element::fixed("User"), Element::property(Arc::clone(&id))],
        invoke_fn(|args, _| Ok(json!({"Id": args[0], "Name": "Ana"}))),
    );
    let rename = declare(
        "users.rename",
        Method::Update,
        vec![Input::new("Id", id_type)],
        ApiType::None,
        vec![Element::fixed("User"), Element::property(id), Element::fixed("Rename")],
        invoke_fn(|args, _| {
            if args[0] == json!(0) {
                return Err(InvokeError::Input(InputError::new(
                    Ref::new("Invalid id").model("User").property("Id"),
                )));
            }
            Ok(Value::Null)
        }),
    );

    let mut assembly = Assembly::new("assembler");
    assembly.add(ProcessMethodHandler::new()).unwrap();
    let processing = Processing::builder(&assembly)
        .source(register::spec().defines(&register::INVOKERS))
        .source(invoker::registered())
        .build()
        .unwrap();
    register_invokers(&processing, vec![get_user, rename])
        .await
        .unwrap()
}

/// Matches the request URI against the invoker paths.
fn find_invoker(invokers: Vec<SharedContext>) -> impl Processor {
    FnProcessor::new(
        "find_invoker",
        vec![
            request::spec()
                .requires(&request::URI)
                .defines(&request::INVOKER)
                .defines(&request::ARGUMENTS),
            response::coded(),
            invoker::spec().requires(&invoker::PATH),
        ],
        move |chain| {
            let uri = chain.arg(request::CONTEXT)?.require(&request::URI)?.clone();
            let segments: Vec<&str> = uri.split('/').collect();

            for shared in &invokers {
                let mut arguments = Arguments::new();
                let matched = {
                    let context = shared.read();
                    let path = context.require(&invoker::PATH)?;
                    path.len() == segments.len()
                        && path.iter().zip(&segments).all(|(element, segment)| {
                            match element.as_property() {
                                Some(property) => match segment.parse::<i64>() {
                                    Ok(value) => {
                                        arguments.insert(property.name().to_string(), json!(value));
                                        true
                                    }
                                    Err(_) => false,
                                },
                                None => element.name() == *segment,
                            }
                        })
                };
                if matched {
                    let req = chain.arg_mut(request::CONTEXT)?;
                    req.set(&request::INVOKER, Arc::clone(shared))?;
                    req.set(&request::ARGUMENTS, arguments)?;
                    return Ok(());
                }
            }

            NOT_FOUND.set(chain.arg_mut(response::CONTEXT)?)?;
            chain.cancel();
            Ok(())
        },
    )
}

async fn server() -> Processing {
    let mut resources = Assembly::new("resources");
    resources.add(find_invoker(invokers().await)).unwrap();
    resources.add(InvokingHandler::new()).unwrap();

    let mut assembly = Assembly::new("server");
    assembly
        .add(RoutingByPathHandler::new(resources, "resources"))
        .unwrap();
    Processing::builder(&assembly)
        .source(request::spec().defines(&request::URI))
        .source(invoker::registered())
        .build()
        .unwrap()
}

async fn serve(processing: &Processing, uri: &str) -> Context {
    let mut req = processing.new_context(request::CONTEXT).unwrap();
    req.set(&request::URI, uri.to_string()).unwrap();
    let mut contexts = processing.execute(Contexts::new().with(req)).await.unwrap();
    contexts.take(response::CONTEXT).unwrap()
}

#[tokio::test]
async fn test_get_model() {
    let processing = server().await;
    let resp = serve(&processing, "/resources/User/7").await;
    assert_eq!(
        resp.get(&response::OBJ).unwrap(),
        Some(&json!({"Id": 7, "Name": "Ana"}))
    );
    assert!(!is_failed(&resp).unwrap());
}

#[tokio::test]
async fn test_update_and_input_error() {
    let processing = server().await;

    let resp = serve(&processing, "resources/User/3/Rename").await;
    assert_eq!(resp.get(&response::CODE).unwrap().map(String::as_str), Some(UPDATE_SUCCESS.code));

    let resp = serve(&processing, "resources/User/0/Rename").await;
    assert_eq!(resp.get(&response::STATUS).unwrap(), Some(&400));
    assert!(resp.contains(&response::ERROR_DETAILS));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let processing = server().await;
    let resp = serve(&processing, "resources/Group/1").await;
    assert_eq!(resp.get(&response::STATUS).unwrap(), Some(&404));
    assert!(!resp.contains(&response::OBJ));
}
