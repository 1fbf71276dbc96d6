//! Runner errors

use std::process::ExitStatus;

use thiserror::Error;
use tracectl_shared::bytecode::CompileError;

#[derive(Debug, Error)]
pub enum RunAsError {
    #[error("failed to spawn filter helper: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("filter helper has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("I/O error talking to filter helper: {0}")]
    Io(#[from] std::io::Error),

    #[error("filter helper exited with {status}: {stderr}")]
    HelperFailed { status: ExitStatus, stderr: String },

    #[error("malformed filter helper message: {0}")]
    Protocol(#[from] bincode::Error),

    #[error("filter helper speaks protocol version {found}, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("filter helper returned empty bytecode")]
    EmptyBytecode,

    #[error("filter bytecode of {len} bytes exceeds the {max} byte limit")]
    BytecodeTooLarge { len: usize, max: usize },

    #[error("{0}")]
    Rejected(String),
}

impl From<RunAsError> for CompileError {
    fn from(err: RunAsError) -> Self {
        match err {
            RunAsError::Rejected(reason) => CompileError::Rejected(reason),
            RunAsError::Io(err) => CompileError::Io(err),
            other => CompileError::Unavailable(other.to_string()),
        }
    }
}
