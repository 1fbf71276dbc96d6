//! Helper IPC protocol.
//!
//! One request is written to the helper's stdin, one reply is read from its
//! stdout. Both use bincode with an explicit config so the daemon and the
//! helper agree on the encoding (fixint for lengths and enums) regardless of
//! how either was built.

use bincode::Options;
use serde::{Deserialize, Serialize};

/// Protocol version
pub const PROTOCOL_VERSION: u32 = 1;

/// Upper bound on any decoded message; keeps a misbehaving helper from
/// making us allocate arbitrary amounts.
pub const MAX_MESSAGE_LEN: u64 = 16 * 1024 * 1024;

fn wire_bincode() -> impl bincode::config::Options {
    bincode::config::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_MESSAGE_LEN)
        .allow_trailing_bytes()
}

/// Filter compilation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub version: u32,
    pub filter: String,
}

impl CompileRequest {
    pub fn new(filter: &str) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            filter: filter.to_string(),
        }
    }

    pub fn to_bytes(&self) -> bincode::Result<Vec<u8>> {
        wire_bincode().serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> bincode::Result<Self> {
        wire_bincode().deserialize(bytes)
    }
}

/// What the helper made of the filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompileOutcome {
    Bytecode(Vec<u8>),
    Rejected(String),
}

/// Filter compilation reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileReply {
    pub version: u32,
    pub outcome: CompileOutcome,
}

impl CompileReply {
    pub fn new(outcome: CompileOutcome) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            outcome,
        }
    }

    pub fn to_bytes(&self) -> bincode::Result<Vec<u8>> {
        wire_bincode().serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> bincode::Result<Self> {
        wire_bincode().deserialize(bytes)
    }
}
