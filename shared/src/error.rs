//! Error types for event rules and their payload codec

use std::str::Utf8Error;
use thiserror::Error;

use crate::bytecode::CompileError;

/// Outcome of a rule setter that did not succeed.
///
/// An unset optional field is not an error: getters return `None` instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RuleError {
    /// Malformed or out-of-contract input (empty pattern, out-of-range level).
    #[error("invalid event rule argument")]
    Invalid,

    /// The operation is not meaningful for the rule's domain.
    #[error("operation unsupported by the event rule's domain")]
    Unsupported,
}

/// Errors raised while encoding to or decoding from a payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload too short for {what}: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{what} is not NUL-terminated at its declared length ({len} bytes)")]
    MissingTerminator { what: &'static str, len: usize },

    #[error("{what} is not a valid UTF-8 string: {error}")]
    NotAString {
        what: &'static str,
        #[source]
        error: Utf8Error,
    },

    #[error("{what} declares {declared} bytes but {consumed} were decoded")]
    LengthMismatch {
        what: &'static str,
        declared: usize,
        consumed: usize,
    },

    #[error("{what} of {len} bytes does not fit in a 32-bit length field")]
    FieldTooLarge { what: &'static str, len: usize },

    #[error("unknown event rule type ({0})")]
    UnknownRuleKind(i8),

    #[error("invalid domain type value ({0})")]
    UnknownDomain(i8),

    #[error("unknown log level rule type ({0})")]
    UnknownLogLevelRuleKind(i8),

    #[error("unknown {what} type ({value})")]
    UnknownLocationKind { what: &'static str, value: i8 },

    #[error("decoded {what} was rejected: {source}")]
    Rejected {
        what: &'static str,
        #[source]
        source: RuleError,
    },

    #[error("decoded event rule failed validation")]
    InvalidRule,
}

/// Errors raised while generating filter bytecode.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter expression (or synthesized agent filter) is unusable.
    #[error("invalid filter expression")]
    Invalid,

    /// The external compiler refused or failed to produce bytecode.
    #[error("failed to compile filter bytecode: {0}")]
    Compile(#[from] CompileError),
}

/// Errors raised while deriving runtime artifacts from a rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("truncation occurred when copying event rule pattern to event descriptor: pattern = '{0}'")]
    NameTruncated(String),

    #[error("exclusion '{0}' does not fit in a symbol name slot")]
    ExclusionTooLong(String),

    #[error("event rule has no event name")]
    MissingName,
}
