//! Error types for the processor engine.

use std::fmt;
use thiserror::Error;

/// Errors raised when reading or writing context attributes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    /// The context schema does not contain the attribute.
    #[error("context '{context}' has no attribute '{attribute}'")]
    UnknownAttribute {
        /// The context name.
        context: String,
        /// The attribute name.
        attribute: String,
    },

    /// The attribute key type differs from the schema type.
    #[error("attribute '{context}.{attribute}' is of type {expected}, not {found}")]
    TypeMismatch {
        /// The context name.
        context: String,
        /// The attribute name.
        attribute: String,
        /// The type declared in the schema.
        expected: &'static str,
        /// The type of the key used.
        found: &'static str,
    },

    /// A required attribute has no value.
    #[error("attribute '{context}.{attribute}' has no value")]
    MissingValue {
        /// The context name.
        context: String,
        /// The attribute name.
        attribute: String,
    },

    /// No schema exists for the context name.
    #[error("no context named '{0}' is known to the processing")]
    UnknownContext(String),
}

/// One attribute that no processor or source defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unavailable {
    /// The context name.
    pub context: String,
    /// The attribute name.
    pub attribute: String,
    /// The processors requiring it.
    pub required_by: Vec<String>,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}.{}' required by {}",
            self.context,
            self.attribute,
            self.required_by.join(", ")
        )
    }
}

/// Errors raised while resolving processor declarations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The same attribute is declared with two different types.
    #[error(
        "attribute '{context}.{attribute}' declared as {found} by '{owner}' but already known as {expected}"
    )]
    IncompatibleType {
        /// The context name.
        context: String,
        /// The attribute name.
        attribute: String,
        /// The type already known.
        expected: &'static str,
        /// The conflicting type.
        found: &'static str,
        /// The declaring owner (processor or source).
        owner: String,
    },

    /// The same context name is declared as an argument and as a nested context.
    #[error("context '{context}' is declared both as argument and as nested context by '{owner}'")]
    KindConflict {
        /// The context name.
        context: String,
        /// The declaring owner.
        owner: String,
    },

    /// Required attributes have no definer.
    #[error("unavailable attributes: {}", join(.0))]
    Unavailable(Vec<Unavailable>),
}

fn join(unavailable: &[Unavailable]) -> String {
    unavailable
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while composing assemblies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssemblyError {
    /// No processor with the given name exists in the assembly.
    #[error("assembly '{assembly}' has no processor named '{processor}'")]
    UnknownProcessor {
        /// The assembly name.
        assembly: String,
        /// The processor name looked up.
        processor: String,
    },

    /// A processor with the same name is already part of the assembly.
    #[error("assembly '{assembly}' already contains a processor named '{processor}'")]
    Duplicate {
        /// The assembly name.
        assembly: String,
        /// The duplicated processor name.
        processor: String,
    },
}

/// Signals that processing must stop because of the given reasons.
///
/// Assemblers use it to report the registrations that cannot be used, the
/// caller decides whether to drop them and retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    reasons: Vec<String>,
}

impl Abort {
    /// Creates an abort with a single reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reasons: vec![reason.into()],
        }
    }

    /// Creates an abort with several reasons.
    ///
    /// Returns `None` when no reason is provided.
    pub fn with_reasons<I, S>(reasons: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reasons: Vec<String> = reasons.into_iter().map(Into::into).collect();
        if reasons.is_empty() {
            None
        } else {
            Some(Self { reasons })
        }
    }

    /// Returns the abort reasons.
    #[must_use]
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aborted for {}", self.reasons.join(", "))
    }
}

impl std::error::Error for Abort {}

/// Errors returned by a processor.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Processing was aborted.
    #[error(transparent)]
    Abort(#[from] Abort),

    /// A context attribute could not be accessed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The chain does not carry the argument context.
    #[error("missing argument context '{0}'")]
    MissingArgument(String),

    /// The processor has no branch with the index.
    #[error("processor '{processor}' has no branch {index}")]
    NoBranch {
        /// The processor name.
        processor: String,
        /// The branch index requested.
        index: usize,
    },

    /// The processing is misconfigured (a developer error).
    #[error("{message}")]
    Devel {
        /// Description of the misconfiguration.
        message: String,
    },

    /// A processor of a branch failed.
    #[error(transparent)]
    Branch(Box<ChainError>),

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProcessError {
    /// Creates a developer error.
    #[must_use]
    pub fn devel(message: impl Into<String>) -> Self {
        Self::Devel {
            message: message.into(),
        }
    }
}

/// Errors returned from executing a chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A processor aborted the processing.
    #[error("processor '{processor}' {abort}")]
    Aborted {
        /// The aborting processor.
        processor: String,
        /// The abort reasons.
        abort: Abort,
    },

    /// A processor failed.
    #[error("processor '{processor}' failed: {source}")]
    Processor {
        /// The failing processor.
        processor: String,
        /// The underlying error.
        #[source]
        source: ProcessError,
    },

    /// The execution input was invalid.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl ChainError {
    /// Returns the abort if the chain was aborted.
    #[must_use]
    pub fn as_abort(&self) -> Option<&Abort> {
        match self {
            Self::Aborted { abort, .. } => Some(abort),
            _ => None,
        }
    }

    /// Returns the name of the failing processor.
    #[must_use]
    pub fn processor(&self) -> Option<&str> {
        match self {
            Self::Aborted { processor, .. } | Self::Processor { processor, .. } => Some(processor),
            Self::Context(_) => None,
        }
    }

    pub(crate) fn from_process(processor: &str, error: ProcessError) -> Self {
        match error {
            ProcessError::Branch(inner) => *inner,
            ProcessError::Abort(abort) => Self::Aborted {
                processor: processor.to_string(),
                abort,
            },
            source => Self::Processor {
                processor: processor.to_string(),
                source,
            },
        }
    }
}
