//! Error types for the vigil runtime.

use thiserror::Error;

/// All errors that can be produced by the vigil runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VigilError {
    /// No token rule matched at `offset` in the expression source.
    #[error("LexError at offset {offset}: {message}")]
    Lex {
        /// Byte offset of the offending character.
        offset: usize,
        /// Human-readable description.
        message: String,
    },

    /// The token stream did not match the expression grammar.
    #[error("ParseError: {0}")]
    Parse(String),

    /// A malformed AST reached the compiler.
    #[error("CompileError: {0}")]
    Compile(String),

    /// A filter-chain segment named a filter that is not registered.
    #[error("UnknownFilterError: {0}")]
    UnknownFilter(String),

    /// Evaluation touched a disallowed member name or object reference.
    #[error("SecurityError: {0}")]
    Security(String),

    /// A value was used in a way its type does not permit (e.g. calling a
    /// number).
    #[error("TypeError: {0}")]
    Type(String),

    /// A digest or apply was started while another phase was active.
    #[error("PhaseError: {0} already in progress")]
    Phase(&'static str),

    /// The digest did not settle within the configured iteration budget.
    #[error("UnstableDigestError: {ttl} digest iterations reached")]
    UnstableDigest {
        /// The iteration budget that was exhausted.
        ttl: usize,
    },

    /// The injector was asked for a name no module provides.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// A module name was looked up that was never registered.
    #[error("Module {0} is not available")]
    UnknownModule(String),

    /// The injector found a dependency cycle.
    #[error("Circular dependency found: {0}")]
    CircularDependency(String),

    /// A host callback (watch function, listener, task, native function)
    /// failed with a custom message.
    #[error("{0}")]
    Callback(String),
}

impl VigilError {
    /// Builds a [`VigilError::Callback`] from any displayable message.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into())
    }

    /// Returns `true` for [`VigilError::Security`].
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }
}

/// Convenient `Result` alias for fallible runtime operations.
pub type VigilResult<T> = Result<T, VigilError>;
