//! Event rules
//!
//! An event rule describes which tracer activity should be matched: a
//! tracepoint name pattern, a system call, or a kernel/userspace probe,
//! optionally refined with a filter expression, a log level rule and
//! exclusions. [`EventRule`] is the closed set of rule kinds; every generic
//! operation (validation, codec, equality, hashing and artifact generation)
//! dispatches on it.
//!
//! Rules are built and mutated by a single thread while a client request is
//! handled. Once shared (see [`crate::registry`]) they are only read.

pub mod kernel_function;
pub mod kernel_probe;
pub mod syscall;
pub mod tracepoint;
pub mod userspace_probe;

pub use kernel_function::KernelFunctionRule;
pub use kernel_probe::KernelProbeRule;
pub use syscall::SyscallRule;
pub use tracepoint::TracepointRule;
pub use userspace_probe::UserspaceProbeRule;

use serde::Serialize;
use tracing::{debug, error};

use crate::bytecode::{Bytecode, BytecodeCompiler, Credentials, InternalFilter};
use crate::error::{FilterError, GenerateError, PayloadError};
use crate::protocol::{Payload, PayloadView};
use crate::types::domain::DomainType;
use crate::types::legacy::{EventExclusion, LegacyEvent};

/// Kind tag of an event rule, as carried in the payload header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRuleKind {
    Tracepoint,
    Syscall,
    KernelProbe,
    KernelFunction,
    UserspaceProbe,
}

impl EventRuleKind {
    pub fn as_raw(self) -> i8 {
        match self {
            EventRuleKind::Tracepoint => 0,
            EventRuleKind::Syscall => 1,
            EventRuleKind::KernelProbe => 2,
            EventRuleKind::KernelFunction => 3,
            EventRuleKind::UserspaceProbe => 4,
        }
    }

    pub fn from_raw(raw: i8) -> Option<Self> {
        match raw {
            0 => Some(EventRuleKind::Tracepoint),
            1 => Some(EventRuleKind::Syscall),
            2 => Some(EventRuleKind::KernelProbe),
            3 => Some(EventRuleKind::KernelFunction),
            4 => Some(EventRuleKind::UserspaceProbe),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventRuleKind::Tracepoint => "tracepoint",
            EventRuleKind::Syscall => "syscall",
            EventRuleKind::KernelProbe => "probe",
            EventRuleKind::KernelFunction => "function",
            EventRuleKind::UserspaceProbe => "userspace-probe",
        }
    }
}

impl std::fmt::Display for EventRuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicate over tracer activity.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventRule {
    Tracepoint(TracepointRule),
    Syscall(SyscallRule),
    KernelProbe(KernelProbeRule),
    KernelFunction(KernelFunctionRule),
    UserspaceProbe(UserspaceProbeRule),
}

impl EventRule {
    pub fn kind(&self) -> EventRuleKind {
        match self {
            EventRule::Tracepoint(_) => EventRuleKind::Tracepoint,
            EventRule::Syscall(_) => EventRuleKind::Syscall,
            EventRule::KernelProbe(_) => EventRuleKind::KernelProbe,
            EventRule::KernelFunction(_) => EventRuleKind::KernelFunction,
            EventRule::UserspaceProbe(_) => EventRuleKind::UserspaceProbe,
        }
    }

    /// Whether the rule satisfies the invariants of its kind.
    pub fn validate(&self) -> bool {
        match self {
            EventRule::Tracepoint(rule) => rule.validate(),
            EventRule::Syscall(rule) => rule.validate(),
            EventRule::KernelProbe(rule) => rule.validate(),
            EventRule::KernelFunction(rule) => rule.validate(),
            EventRule::UserspaceProbe(rule) => rule.validate(),
        }
    }

    /// Append the `{ kind: i8 }` header followed by the kind-specific body.
    pub fn serialize(&self, payload: &mut Payload) -> Result<(), PayloadError> {
        debug!("Serializing {} event rule", self.kind());
        // A body that fails to encode takes its header byte with it.
        payload.append_with(|payload| {
            payload.append_i8(self.kind().as_raw());
            match self {
                EventRule::Tracepoint(rule) => rule.serialize(payload),
                EventRule::Syscall(rule) => rule.serialize(payload),
                EventRule::KernelProbe(rule) => rule.serialize(payload),
                EventRule::KernelFunction(rule) => rule.serialize(payload),
                EventRule::UserspaceProbe(rule) => rule.serialize(payload),
            }
        })
    }

    /// Decode a rule, returning it with the number of bytes consumed.
    ///
    /// The decoded rule is validated as a whole: well-formed fields that do
    /// not make up a valid rule are rejected.
    pub fn create_from_payload(view: PayloadView<'_>) -> Result<(Self, usize), PayloadError> {
        let mut cursor = view.cursor();
        let raw_kind = cursor.read_i8("event rule header")?;
        debug!("Deserializing event rule from payload");

        let (rule, consumed) = match EventRuleKind::from_raw(raw_kind) {
            Some(EventRuleKind::Tracepoint) => {
                let (rule, consumed) = TracepointRule::create_from_payload(cursor.rest())?;
                (EventRule::Tracepoint(rule), consumed)
            }
            Some(EventRuleKind::Syscall) => {
                let (rule, consumed) = SyscallRule::create_from_payload(cursor.rest())?;
                (EventRule::Syscall(rule), consumed)
            }
            Some(EventRuleKind::KernelProbe) => {
                let (rule, consumed) = KernelProbeRule::create_from_payload(cursor.rest())?;
                (EventRule::KernelProbe(rule), consumed)
            }
            Some(EventRuleKind::UserspaceProbe) => {
                let (rule, consumed) = UserspaceProbeRule::create_from_payload(cursor.rest())?;
                (EventRule::UserspaceProbe(rule), consumed)
            }
            // Kernel function rules are encode-only.
            Some(EventRuleKind::KernelFunction) | None => {
                error!("Attempted to create event rule of unknown type ({})", raw_kind);
                return Err(PayloadError::UnknownRuleKind(raw_kind));
            }
        };
        cursor.advance("event rule body", consumed)?;

        if !rule.validate() {
            return Err(PayloadError::InvalidRule);
        }

        Ok((rule, cursor.consumed()))
    }

    /// Hash consistent with equality: equal rules hash equal.
    pub fn hash(&self) -> u64 {
        match self {
            EventRule::Tracepoint(rule) => rule.hash(),
            EventRule::Syscall(rule) => rule.hash(),
            EventRule::KernelProbe(rule) => rule.hash(),
            EventRule::KernelFunction(rule) => rule.hash(),
            EventRule::UserspaceProbe(rule) => rule.hash(),
        }
    }

    pub fn domain_type(&self) -> DomainType {
        match self {
            EventRule::Tracepoint(rule) => rule.domain(),
            EventRule::Syscall(_)
            | EventRule::KernelProbe(_)
            | EventRule::KernelFunction(_)
            | EventRule::UserspaceProbe(_) => DomainType::Kernel,
        }
    }

    pub fn targets_agent_domain(&self) -> bool {
        self.domain_type().is_agent()
    }

    /// Compile the rule's filter (if any) and cache the source and bytecode
    /// on the rule. Blocks for the duration of the compiler call.
    pub fn generate_filter_bytecode(
        &mut self,
        creds: &Credentials,
        compiler: &dyn BytecodeCompiler,
    ) -> Result<(), FilterError> {
        match self {
            EventRule::Tracepoint(rule) => rule.generate_filter_bytecode(creds, compiler),
            EventRule::Syscall(rule) => rule.generate_filter_bytecode(creds, compiler),
            EventRule::KernelProbe(_)
            | EventRule::KernelFunction(_)
            | EventRule::UserspaceProbe(_) => Ok(()),
        }
    }

    /// Filter source compiled by the last [`generate_filter_bytecode`](Self::generate_filter_bytecode).
    pub fn filter(&self) -> Option<&str> {
        self.internal_filter().map(|internal| internal.filter.as_str())
    }

    /// Bytecode produced by the last [`generate_filter_bytecode`](Self::generate_filter_bytecode).
    pub fn filter_bytecode(&self) -> Option<&Bytecode> {
        self.internal_filter().map(|internal| &internal.bytecode)
    }

    fn internal_filter(&self) -> Option<&InternalFilter> {
        match self {
            EventRule::Tracepoint(rule) => rule.internal_filter(),
            EventRule::Syscall(rule) => rule.internal_filter(),
            EventRule::KernelProbe(_)
            | EventRule::KernelFunction(_)
            | EventRule::UserspaceProbe(_) => None,
        }
    }

    /// Exclusion block for the tracer; `None` when the rule has none.
    pub fn generate_exclusions(&self) -> Result<Option<EventExclusion>, GenerateError> {
        match self {
            EventRule::Tracepoint(rule) => rule.generate_exclusions(),
            EventRule::Syscall(_)
            | EventRule::KernelProbe(_)
            | EventRule::KernelFunction(_)
            | EventRule::UserspaceProbe(_) => Ok(None),
        }
    }

    /// Legacy event descriptor equivalent to the rule.
    pub fn generate_lttng_event(&self) -> Result<LegacyEvent, GenerateError> {
        match self {
            EventRule::Tracepoint(rule) => rule.generate_lttng_event(),
            EventRule::Syscall(rule) => rule.generate_lttng_event(),
            EventRule::KernelProbe(rule) => rule.generate_lttng_event(),
            EventRule::KernelFunction(rule) => rule.generate_lttng_event(),
            EventRule::UserspaceProbe(rule) => rule.generate_lttng_event(),
        }
    }

    pub fn as_tracepoint(&self) -> Option<&TracepointRule> {
        match self {
            EventRule::Tracepoint(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_syscall(&self) -> Option<&SyscallRule> {
        match self {
            EventRule::Syscall(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_kernel_probe(&self) -> Option<&KernelProbeRule> {
        match self {
            EventRule::KernelProbe(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_userspace_probe(&self) -> Option<&UserspaceProbeRule> {
        match self {
            EventRule::UserspaceProbe(rule) => Some(rule),
            _ => None,
        }
    }
}

/// Structural equality; cached filter bytecode never participates.
impl PartialEq for EventRule {
    fn eq(&self, other: &Self) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        if std::ptr::eq(self, other) {
            return true;
        }

        match (self, other) {
            (EventRule::Tracepoint(a), EventRule::Tracepoint(b)) => a == b,
            (EventRule::Syscall(a), EventRule::Syscall(b)) => a == b,
            (EventRule::KernelProbe(a), EventRule::KernelProbe(b)) => a == b,
            (EventRule::KernelFunction(a), EventRule::KernelFunction(b)) => a == b,
            (EventRule::UserspaceProbe(a), EventRule::UserspaceProbe(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for EventRule {}

impl From<TracepointRule> for EventRule {
    fn from(rule: TracepointRule) -> Self {
        EventRule::Tracepoint(rule)
    }
}

impl From<SyscallRule> for EventRule {
    fn from(rule: SyscallRule) -> Self {
        EventRule::Syscall(rule)
    }
}

impl From<KernelProbeRule> for EventRule {
    fn from(rule: KernelProbeRule) -> Self {
        EventRule::KernelProbe(rule)
    }
}

impl From<KernelFunctionRule> for EventRule {
    fn from(rule: KernelFunctionRule) -> Self {
        EventRule::KernelFunction(rule)
    }
}

impl From<UserspaceProbeRule> for EventRule {
    fn from(rule: UserspaceProbeRule) -> Self {
        EventRule::UserspaceProbe(rule)
    }
}

/// Compile `source` when it is non-empty. No source means nothing to cache.
pub(crate) fn compile_filter(
    source: Option<String>,
    creds: &Credentials,
    compiler: &dyn BytecodeCompiler,
) -> Result<Option<InternalFilter>, FilterError> {
    let Some(filter) = source.filter(|source| !source.is_empty()) else {
        return Ok(None);
    };

    debug!("Generating filter bytecode for '{}'", filter);
    let bytecode = compiler.compile(&filter, creds).map_err(|e| {
        error!("Failed to generate filter bytecode for '{}': {}", filter, e);
        FilterError::Compile(e)
    })?;

    Ok(Some(InternalFilter { filter, bytecode }))
}
