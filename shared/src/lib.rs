//! Shared types for tracectl
//!
//! This crate contains the event rule model used by the session daemon and
//! its tools: rule kinds and their validation, the binary payload codec used
//! between the client library and the daemon, rule equality and hashing,
//! and the artifacts derived from rules (filter bytecode, exclusion blocks
//! and legacy event descriptors).

pub mod bytecode;
pub mod error;
pub mod event_rule;
pub mod log_level_rule;
pub mod protocol;
pub mod registry;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use bytecode::{Bytecode, BytecodeCompiler, CompileError, Credentials};
pub use error::{FilterError, GenerateError, PayloadError, RuleError};
pub use event_rule::{EventRule, EventRuleKind};
pub use log_level_rule::LogLevelRule;
pub use protocol::{Payload, PayloadView};
pub use registry::{RuleRegistry, SharedEventRule};
pub use types::domain::DomainType;
