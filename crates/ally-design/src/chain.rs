//! Chain execution.
//!
//! A [`Chain`] is one run of a [`Processing`]. It owns the argument contexts
//! while processors run, strictly in assembly order.
//!
//! # Lifecycle
//!
//! ```text
//! execute ─► processor 1 ─► processor 2 ─► ... ─► finalizers ─► contexts
//!                 │              │
//!                 │              └─ cancel(): remaining processors skipped
//!                 └─ branch(i): runs a branch over the same contexts
//! ```
//!
//! Finalizers registered with [`Chain::on_finalize`] always run once, in
//! reverse registration order, whether the chain completed, was cancelled or
//! failed.

use crate::context::{Context, ContextSchema, Contexts};
use crate::error::{ChainError, ProcessError};
use crate::processing::Processing;
use ally_telemetry::metrics::{record_chain, ChainOutcome};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, trace, Instrument};
use uuid::Uuid;

type Finalizer = Box<dyn FnOnce(&mut Contexts) + Send>;

/// One execution of a processing.
pub struct Chain {
    processing: Processing,
    contexts: Contexts,
    current: Option<usize>,
    cancelled: bool,
    finalizers: Vec<Finalizer>,
    execution_id: Uuid,
}

impl Chain {
    pub(crate) fn new(processing: Processing, contexts: Contexts) -> Self {
        Self {
            processing,
            contexts,
            current: None,
            cancelled: false,
            finalizers: Vec::new(),
            execution_id: Uuid::now_v7(),
        }
    }

    /// Returns the execution id, shared by all branches of the execution.
    #[must_use]
    pub const fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Returns the processing currently running, which is a branch while
    /// inside [`Chain::branch`].
    #[must_use]
    pub fn processing(&self) -> &Processing {
        &self.processing
    }

    /// Returns an argument context.
    pub fn arg(&self, name: &str) -> Result<&Context, ProcessError> {
        self.contexts
            .get(name)
            .ok_or_else(|| ProcessError::MissingArgument(name.to_string()))
    }

    /// Returns a mutable argument context.
    pub fn arg_mut(&mut self, name: &str) -> Result<&mut Context, ProcessError> {
        self.contexts
            .get_mut(name)
            .ok_or_else(|| ProcessError::MissingArgument(name.to_string()))
    }

    /// Returns all argument contexts.
    #[must_use]
    pub fn contexts(&self) -> &Contexts {
        &self.contexts
    }

    /// Returns all argument contexts mutably.
    pub fn contexts_mut(&mut self) -> &mut Contexts {
        &mut self.contexts
    }

    /// Creates an empty context of a resolved schema.
    pub fn create(&self, name: &str) -> Result<Context, ProcessError> {
        Ok(self.processing.new_context(name)?)
    }

    /// Returns the resolved schema of a context name.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&Arc<ContextSchema>> {
        self.processing.schema(name)
    }

    /// Skips the remaining processors, the chain still completes normally.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Returns true if the chain was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Registers a callback run once the chain ends.
    pub fn on_finalize(&mut self, finalizer: impl FnOnce(&mut Contexts) + Send + 'static) {
        self.finalizers.push(Box::new(finalizer));
    }

    /// Runs branch `index` of the current processor over the same contexts.
    ///
    /// Returns true if the branch was cancelled. Cancelling a branch does not
    /// cancel the calling chain.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::NoBranch` for an unknown index and
    /// `ProcessError::Branch` if a branch processor fails.
    pub async fn branch(&mut self, index: usize) -> Result<bool, ProcessError> {
        let position = self
            .current
            .ok_or_else(|| ProcessError::devel("branch requested outside of a processor"))?;
        let branch = self
            .processing
            .branch(position, index)
            .cloned()
            .ok_or_else(|| ProcessError::NoBranch {
                processor: self.processor_name(position),
                index,
            })?;

        trace!(branch = branch.name(), index, "Entering branch");
        let parent = std::mem::replace(&mut self.processing, branch);
        let parent_cancelled = std::mem::replace(&mut self.cancelled, false);

        let result = self.run().await;

        self.processing = parent;
        self.current = Some(position);
        let cancelled = std::mem::replace(&mut self.cancelled, parent_cancelled);

        result.map_err(|error| ProcessError::Branch(Box::new(error)))?;
        Ok(cancelled)
    }

    pub(crate) async fn execute(mut self) -> Result<Contexts, ChainError> {
        let started = Instant::now();
        let span = debug_span!(
            "chain",
            processing = self.processing.name(),
            execution_id = %self.execution_id
        );
        let name = self.processing.name().to_string();

        let result = self.run().instrument(span).await;

        for finalizer in std::mem::take(&mut self.finalizers).into_iter().rev() {
            finalizer(&mut self.contexts);
        }

        let outcome = match &result {
            Ok(()) if self.cancelled => ChainOutcome::Cancelled,
            Ok(()) => ChainOutcome::Completed,
            Err(ChainError::Aborted { .. }) => ChainOutcome::Aborted,
            Err(_) => ChainOutcome::Failed,
        };
        record_chain(&name, outcome, started.elapsed());
        debug!(processing = %name, %outcome, "Chain finished");

        result.map(|()| self.contexts)
    }

    async fn run(&mut self) -> Result<(), ChainError> {
        let processing = self.processing.clone();
        for (position, processor) in processing.processors().iter().enumerate() {
            if self.cancelled {
                trace!(processor = processor.name(), "Chain cancelled, skipping");
                break;
            }
            self.current = Some(position);
            trace!(processor = processor.name(), "Processing");
            processor
                .process(self)
                .await
                .map_err(|error| ChainError::from_process(processor.name(), error))?;
        }
        Ok(())
    }

    fn processor_name(&self, position: usize) -> String {
        self.processing
            .processors()
            .get(position)
            .map_or_else(String::new, |p| p.name().to_string())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("processing", &self.processing.name())
            .field("execution_id", &self.execution_id)
            .field("cancelled", &self.cancelled)
            .field("contexts", &self.contexts)
            .finish_non_exhaustive()
    }
}
