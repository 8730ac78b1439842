//! Validates registered invokers per method.
//!
//! Runs in the assembler processing. Each invoker gets the model it works on
//! as its target; invokers whose signature does not fit their method are
//! dropped from the register with an error log.

use crate::api::{ApiType, Method};
use crate::contexts::{invoker, register};
use ally_design::prelude::*;
use ally_telemetry::metrics::record_dropped_invokers;
use tracing::error;

/// Checks invokers against their method and defines their target.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessMethodHandler;

impl ProcessMethodHandler {
    /// Creates the processor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Processor for ProcessMethodHandler {
    fn name(&self) -> &str {
        "process_method"
    }

    fn contexts(&self) -> Vec<ContextSpec> {
        vec![
            register::spec().requires(&register::INVOKERS),
            invoker::spec()
                .requires(&invoker::METHOD)
                .requires(&invoker::INPUTS)
                .requires(&invoker::OUTPUT)
                .requires(&invoker::LOCATION)
                .defines(&invoker::TARGET)
                .defines(&invoker::IS_COLLECTION)
                .defines(&invoker::IS_MODEL),
        ]
    }

    fn process<'a>(&'a self, chain: &'a mut Chain) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let Some(invokers) = chain
                .arg_mut(register::CONTEXT)?
                .get_mut(&register::INVOKERS)?
            else {
                return Ok(());
            };

            let before = invokers.len();
            let mut kept = Vec::with_capacity(before);
            for shared in invokers.drain(..) {
                if process_invoker(&mut shared.write())? {
                    kept.push(shared);
                }
            }
            *invokers = kept;

            let dropped = before - invokers.len();
            if dropped > 0 {
                record_dropped_invokers("method", dropped);
            }
            Ok(())
        })
    }
}

fn process_invoker(context: &mut Context) -> Result<bool, ProcessError> {
    let method = *context.require(&invoker::METHOD)?;
    let location = context.require(&invoker::LOCATION)?.clone();
    let output = context.require(&invoker::OUTPUT)?.clone();

    match method {
        Method::Get => {
            let mut output = &output;
            if let ApiType::Iter(item) = output {
                context.set(&invoker::IS_COLLECTION, true)?;
                output = &**item;
            }
            let model = match output {
                ApiType::Property(property) => property.model().cloned(),
                ApiType::Model(model) => {
                    context.set(&invoker::IS_MODEL, true)?;
                    Some(model.clone())
                }
                _ => None,
            };
            match model {
                Some(model) => {
                    context.set(&invoker::TARGET, model)?;
                    Ok(true)
                }
                None => {
                    error!(%location, %output, "Cannot use GET, the output is not for a model");
                    Ok(false)
                }
            }
        }
        Method::Insert => {
            let model = match &output {
                ApiType::Property(property) => property.model().cloned(),
                ApiType::Model(model) => Some(model.clone()),
                _ => None,
            };
            match model {
                Some(model) => {
                    context.set(&invoker::TARGET, model)?;
                    Ok(true)
                }
                None => {
                    error!(%location, %output, "Cannot use INSERT, the output is not for a model");
                    Ok(false)
                }
            }
        }
        Method::Update => {
            let models: Vec<_> = context
                .require(&invoker::INPUTS)?
                .iter()
                .filter_map(|input| input.kind().as_model().cloned())
                .collect();
            match models.as_slice() {
                [] => Ok(true),
                [model] => {
                    context.set(&invoker::TARGET, model.clone())?;
                    Ok(true)
                }
                _ => {
                    error!(%location, models = models.len(), "Cannot use UPDATE, there are too many models as input");
                    Ok(false)
                }
            }
        }
        Method::Delete => {
            if output.is_of(&ApiType::Boolean) {
                Ok(true)
            } else {
                error!(%location, %output, "Cannot use DELETE, the output is not a boolean");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Input, TypeModel};
    use std::sync::Arc;

    fn processing() -> Processing {
        let mut assembly = Assembly::new("assembler");
        assembly.add(ProcessMethodHandler::new()).unwrap();
        Processing::builder(&assembly)
            .source(register::spec().defines(&register::INVOKERS))
            .source(invoker::registered())
            .build()
            .unwrap()
    }

    fn user() -> Arc<TypeModel> {
        Arc::new(TypeModel::new("User").with_id("Id"))
    }

    fn invoker(
        processing: &Processing,
        location: &str,
        method: Method,
        inputs: Vec<Input>,
        output: ApiType,
    ) -> SharedContext {
        let mut context = processing.new_context(invoker::CONTEXT).unwrap();
        context.set(&invoker::METHOD, method).unwrap();
        context.set(&invoker::INPUTS, inputs).unwrap();
        context.set(&invoker::OUTPUT, output).unwrap();
        context.set(&invoker::LOCATION, location.to_string()).unwrap();
        share(context)
    }

    async fn run(processing: &Processing, invokers: Vec<SharedContext>) -> Vec<String> {
        let mut register = processing.new_context(register::CONTEXT).unwrap();
        register.set(&register::INVOKERS, invokers).unwrap();
        let contexts = processing
            .execute(Contexts::new().with(register))
            .await
            .unwrap();
        contexts
            .get(register::CONTEXT)
            .unwrap()
            .require(&register::INVOKERS)
            .unwrap()
            .iter()
            .map(|invoker| invoker.read().require(&invoker::LOCATION).unwrap().clone())
            .collect()
    }

    #[tokio::test]
    async fn test_get_targets() {
        let processing = processing();
        let user = user();
        let collection = invoker(
            &processing,
            "all",
            Method::Get,
            Vec::new(),
            ApiType::iter(ApiType::property(&user, "Id", ApiType::Integer)),
        );
        let model = invoker(
            &processing,
            "one",
            Method::Get,
            Vec::new(),
            ApiType::Model(Arc::clone(&user)),
        );
        let text = invoker(&processing, "text", Method::Get, Vec::new(), ApiType::String);

        let kept = run(&processing, vec![collection.clone(), model.clone(), text]).await;
        assert_eq!(kept, ["all", "one"]);

        let collection = collection.read();
        assert_eq!(collection.get(&invoker::IS_COLLECTION).unwrap(), Some(&true));
        assert!(!collection.contains(&invoker::IS_MODEL));
        assert_eq!(collection.require(&invoker::TARGET).unwrap().name(), "User");

        let model = model.read();
        assert_eq!(model.get(&invoker::IS_MODEL).unwrap(), Some(&true));
        assert!(!model.contains(&invoker::IS_COLLECTION));
    }

    #[tokio::test]
    async fn test_update_with_many_models_is_dropped() {
        let processing = processing();
        let user = user();
        let group = Arc::new(TypeModel::new("Group"));
        let single = invoker(
            &processing,
            "single",
            Method::Update,
            vec![Input::new("user", ApiType::Model(Arc::clone(&user)))],
            ApiType::None,
        );
        let double = invoker(
            &processing,
            "double",
            Method::Update,
            vec![
                Input::new("user", ApiType::Model(user)),
                Input::new("group", ApiType::Model(group)),
            ],
            ApiType::None,
        );
        let plain = invoker(&processing, "plain", Method::Update, Vec::new(), ApiType::None);

        let kept = run(&processing, vec![single.clone(), double, plain.clone()]).await;
        assert_eq!(kept, ["single", "plain"]);
        assert!(single.read().contains(&invoker::TARGET));
        assert!(!plain.read().contains(&invoker::TARGET));
    }

    #[tokio::test]
    async fn test_without_invokers() {
        let processing = processing();
        let register = processing.new_context(register::CONTEXT).unwrap();
        let contexts = processing
            .execute(Contexts::new().with(register))
            .await
            .unwrap();
        assert!(!contexts
            .get(register::CONTEXT)
            .unwrap()
            .contains(&register::INVOKERS));

        assert!(run(&processing, Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_delete() {
        let processing = processing();
        let user = user();
        let insert = invoker(
            &processing,
            "insert",
            Method::Insert,
            Vec::new(),
            ApiType::property(&user, "Id", ApiType::Integer),
        );
        let bad_insert = invoker(&processing, "bad_insert", Method::Insert, Vec::new(), ApiType::Integer);
        let delete = invoker(&processing, "delete", Method::Delete, Vec::new(), ApiType::Boolean);
        let bad_delete = invoker(&processing, "bad_delete", Method::Delete, Vec::new(), ApiType::None);

        let kept = run(&processing, vec![insert, bad_insert, delete, bad_delete]).await;
        assert_eq!(kept, ["insert", "delete"]);
    }
}
