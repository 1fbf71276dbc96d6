//! Filter bytecode and the compiler boundary
//!
//! Turning filter text into tracer bytecode is done out of process, with
//! the credentials of the client that asked for the rule. The daemon only
//! sees the [`BytecodeCompiler`] trait; implementations live elsewhere (see
//! the `tracectl-filter-compiler` crate) and tests substitute fakes.

use serde::Serialize;
use thiserror::Error;

/// Credentials the filter is compiled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
}

impl Credentials {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }
}

/// Compiled, tracer-executable form of a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bytecode(Vec<u8>);

impl Bytecode {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Filter source together with its compiled bytecode, cached on a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalFilter {
    pub filter: String,
    pub bytecode: Bytecode,
}

/// Failure reported by a [`BytecodeCompiler`].
#[derive(Debug, Error)]
pub enum CompileError {
    /// The compiler understood the request and refused the expression.
    #[error("filter rejected by compiler: {0}")]
    Rejected(String),

    /// The compiler could not be run or did not answer properly.
    #[error("filter compiler unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Compiles filter expressions into bytecode.
///
/// Calls are synchronous and may block on process creation and IPC. They
/// either fully succeed or fully fail.
pub trait BytecodeCompiler {
    fn compile(&self, filter: &str, creds: &Credentials) -> Result<Bytecode, CompileError>;
}
