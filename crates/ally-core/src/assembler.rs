//! Invoker registration.
//!
//! The assembler processing runs once at start-up over the register of all
//! invokers. Assemblers that cannot use an invoker abort with the invoker
//! location as reason; the aborted invokers are dropped and the processing
//! runs again with the rest.

use crate::contexts::{invoker, register};
use crate::error::{AllyError, AllyResult};
use ally_design::support::{push_in, PushOptions, Source};
use ally_design::{share, ChainError, Context, Contexts, Processing, SharedContext};
use ally_telemetry::metrics::record_dropped_invokers;
use tracing::{error, info};

/// Runs the assembler processing over the invokers.
///
/// The invokers are rebound to the resolved `Invoker` schema first, so the
/// assemblers can define the attributes they declare. Returns the invokers
/// kept by the processing.
///
/// # Errors
///
/// Returns `AllyError::Chain` if an assembler fails, and `AllyError::Devel`
/// if an abort names no registered invoker.
pub async fn register_invokers(
    processing: &Processing,
    invokers: Vec<Context>,
) -> AllyResult<Vec<SharedContext>> {
    let mut current = Vec::with_capacity(invokers.len());
    for context in &invokers {
        let mut bound = processing
            .new_context(invoker::CONTEXT)
            .map_err(ChainError::from)?;
        push_in(&mut bound, &[Source::from(context)], &PushOptions::new());
        current.push(share(bound));
    }

    for _ in 0..=invokers.len() {
        let mut context = processing
            .new_context(register::CONTEXT)
            .map_err(ChainError::from)?;
        context
            .set(&register::INVOKERS, current.clone())
            .map_err(ChainError::from)?;

        let err = match processing.execute(Contexts::new().with(context)).await {
            Ok(mut contexts) => {
                let kept = match contexts.get_mut(register::CONTEXT) {
                    Some(context) => context
                        .take(&register::INVOKERS)
                        .map_err(ChainError::from)?
                        .unwrap_or_default(),
                    None => Vec::new(),
                };
                info!(
                    processing = processing.name(),
                    invokers = kept.len(),
                    "Invokers registered"
                );
                return Ok(kept);
            }
            Err(err) => err,
        };

        let Some(abort) = err.as_abort() else {
            return Err(err.into());
        };
        let before = current.len();
        current.retain(|shared| {
            let context = shared.read();
            match context.get(&invoker::LOCATION) {
                Ok(Some(location)) if abort.reasons().contains(location) => {
                    error!(
                        %location,
                        processor = err.processor().unwrap_or_default(),
                        "Invoker dropped, the assembly aborted for it"
                    );
                    false
                }
                _ => true,
            }
        });

        let removed = before - current.len();
        if removed == 0 {
            return Err(AllyError::devel(format!(
                "Assembly aborted for unknown invokers: {err}"
            )));
        }
        record_dropped_invokers("abort", removed);
    }

    Err(AllyError::devel(
        "Assembly keeps aborting after dropping every invoker",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiType, Method, TypeModel};
    use crate::processor::ProcessMethodHandler;
    use ally_design::prelude::*;
    use std::sync::Arc;

    /// Aborts for every DELETE invoker that is still registered.
    fn no_delete() -> impl Processor {
        FnProcessor::new(
            "no_delete",
            vec![
                register::spec().requires(&register::INVOKERS),
                invoker::spec()
                    .requires(&invoker::METHOD)
                    .requires(&invoker::LOCATION),
            ],
            |chain| {
                let invokers = chain
                    .arg(register::CONTEXT)?
                    .require(&register::INVOKERS)?;
                let mut reasons = Vec::new();
                for shared in invokers {
                    let context = shared.read();
                    if *context.require(&invoker::METHOD)? == Method::Delete {
                        reasons.push(context.require(&invoker::LOCATION)?.clone());
                    }
                }
                match Abort::with_reasons(reasons) {
                    Some(abort) => Err(abort.into()),
                    None => Ok(()),
                }
            },
        )
    }

    fn processing() -> Processing {
        let mut assembly = Assembly::new("assembler");
        assembly.add(ProcessMethodHandler::new()).unwrap();
        assembly.add(no_delete()).unwrap();
        Processing::builder(&assembly)
            .source(register::spec().defines(&register::INVOKERS))
            .source(invoker::registered())
            .build()
            .unwrap()
    }

    fn declared(location: &str, method: Method, output: ApiType) -> Context {
        let mut context = Context::from_spec(&invoker::registered());
        context.set(&invoker::METHOD, method).unwrap();
        context.set(&invoker::INPUTS, Vec::new()).unwrap();
        context.set(&invoker::OUTPUT, output).unwrap();
        context.set(&invoker::LOCATION, location.to_string()).unwrap();
        context
    }

    fn locations(invokers: &[SharedContext]) -> Vec<String> {
        invokers
            .iter()
            .map(|shared| shared.read().require(&invoker::LOCATION).unwrap().clone())
            .collect()
    }

    #[tokio::test]
    async fn test_aborted_invokers_are_dropped() {
        let user = Arc::new(TypeModel::new("User"));
        let invokers = vec![
            declared("get_user", Method::Get, ApiType::Model(Arc::clone(&user))),
            declared("delete_user", Method::Delete, ApiType::Boolean),
            declared("get_text", Method::Get, ApiType::String),
        ];

        let kept = register_invokers(&processing(), invokers).await.unwrap();
        assert_eq!(locations(&kept), ["get_user"]);
        assert_eq!(
            kept[0].read().require(&invoker::TARGET).unwrap().name(),
            "User"
        );
    }

    #[tokio::test]
    async fn test_abort_for_unknown_invoker_fails() {
        let mut assembly = Assembly::new("assembler");
        assembly
            .add(FnProcessor::new(
                "always_abort",
                vec![register::spec().requires(&register::INVOKERS)],
                |_| Err(Abort::new("elsewhere").into()),
            ))
            .unwrap();
        let processing = Processing::builder(&assembly)
            .source(register::spec().defines(&register::INVOKERS))
            .build()
            .unwrap();

        let result = register_invokers(&processing, Vec::new()).await;
        assert!(matches!(result, Err(AllyError::Devel { .. })));
    }
}
