//! System call rules (kernel domain)

use serde::Serialize;
use tracing::{debug, error};

use super::{compile_filter, EventRuleKind};
use crate::bytecode::{BytecodeCompiler, Credentials, InternalFilter};
use crate::error::{FilterError, GenerateError, PayloadError, RuleError};
use crate::protocol::payload::{cstr_len, is_wire_string, opt_cstr_len};
use crate::protocol::{Payload, PayloadView};
use crate::types::legacy::{symbol_name, LegacyEvent, LegacyEventType, LogLevelType};
use crate::utils::hash::{hash_key_str, hash_key_u64};

/// `{ pattern_len: u32, filter_len: u32 }`
const HEADER_LEN: usize = 2 * 4;

#[derive(Debug, Clone, Serialize)]
pub struct SyscallRule {
    pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_expression: Option<String>,
    #[serde(skip)]
    internal_filter: Option<InternalFilter>,
}

impl SyscallRule {
    /// A rule matching every system call.
    pub fn new() -> Self {
        Self {
            pattern: super::tracepoint::MATCH_ALL.to_string(),
            filter_expression: None,
            internal_filter: None,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn set_pattern(&mut self, pattern: &str) -> Result<(), RuleError> {
        if !is_wire_string(pattern) {
            return Err(RuleError::Invalid);
        }
        self.pattern = pattern.to_string();
        Ok(())
    }

    pub fn filter_expression(&self) -> Option<&str> {
        self.filter_expression.as_deref()
    }

    pub fn set_filter(&mut self, expression: &str) -> Result<(), RuleError> {
        if !is_wire_string(expression) {
            return Err(RuleError::Invalid);
        }
        self.filter_expression = Some(expression.to_string());
        Ok(())
    }

    pub fn internal_filter(&self) -> Option<&InternalFilter> {
        self.internal_filter.as_ref()
    }

    pub fn validate(&self) -> bool {
        if !is_wire_string(&self.pattern) {
            error!("Invalid syscall event rule: a pattern must be set");
            return false;
        }
        true
    }

    pub fn serialize(&self, payload: &mut Payload) -> Result<(), PayloadError> {
        let pattern_len = cstr_len("syscall pattern", &self.pattern)?;
        let filter_len = opt_cstr_len("syscall filter expression", self.filter_expression())?;

        debug!("Serializing syscall event rule: pattern = '{}'", self.pattern);
        payload.append_u32(pattern_len);
        payload.append_u32(filter_len);
        payload.append_cstr(&self.pattern);
        payload.append_opt_cstr(self.filter_expression());
        Ok(())
    }

    pub fn create_from_payload(view: PayloadView<'_>) -> Result<(Self, usize), PayloadError> {
        let mut cursor = view.cursor();

        let mut header = cursor.take_view("syscall event rule header", HEADER_LEN)?.cursor();
        let pattern_len = header.read_len("pattern length")?;
        let filter_len = header.read_len("filter expression length")?;

        let pattern = cursor.read_cstr("syscall pattern", pattern_len)?;
        let filter = cursor.read_opt_cstr("syscall filter expression", filter_len)?;

        let mut rule = SyscallRule::new();
        rule.set_pattern(pattern)
            .map_err(|source| PayloadError::Rejected {
                what: "syscall pattern",
                source,
            })?;
        if let Some(filter) = filter {
            rule.set_filter(filter)
                .map_err(|source| PayloadError::Rejected {
                    what: "syscall filter expression",
                    source,
                })?;
        }

        Ok((rule, cursor.consumed()))
    }

    pub fn hash(&self) -> u64 {
        let mut hash =
            hash_key_u64(EventRuleKind::Syscall.as_raw() as u64) ^ hash_key_str(&self.pattern);
        if let Some(filter) = &self.filter_expression {
            hash ^= hash_key_str(filter);
        }
        hash
    }

    pub fn generate_filter_bytecode(
        &mut self,
        creds: &Credentials,
        compiler: &dyn BytecodeCompiler,
    ) -> Result<(), FilterError> {
        if self.filter_expression.as_deref() == Some("") {
            return Err(FilterError::Invalid);
        }
        self.internal_filter = compile_filter(self.filter_expression.clone(), creds, compiler)?;
        Ok(())
    }

    pub fn generate_lttng_event(&self) -> Result<LegacyEvent, GenerateError> {
        let name = symbol_name(&self.pattern)
            .ok_or_else(|| GenerateError::NameTruncated(self.pattern.clone()))?;
        Ok(LegacyEvent {
            event_type: LegacyEventType::Syscall,
            name,
            loglevel_type: LogLevelType::All,
            loglevel: 0,
        })
    }
}

impl Default for SyscallRule {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for SyscallRule {
    fn eq(&self, other: &Self) -> bool {
        self.filter_expression.is_some() == other.filter_expression.is_some()
            && self.pattern == other.pattern
            && self.filter_expression == other.filter_expression
    }
}

impl Eq for SyscallRule {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut rule = SyscallRule::new();
        rule.set_pattern("my_event_*").unwrap();
        rule.set_filter("msg_id == 23 && size >= 2048").unwrap();

        let mut payload = Payload::new();
        rule.serialize(&mut payload).unwrap();
        let (decoded, consumed) = SyscallRule::create_from_payload(payload.view()).unwrap();
        assert_eq!(decoded, rule);
        assert_eq!(consumed, payload.len());
        assert_eq!(decoded.filter_expression(), Some("msg_id == 23 && size >= 2048"));
    }

    #[test]
    fn test_filter_participates_in_equality() {
        let mut a = SyscallRule::new();
        a.set_pattern("open").unwrap();
        let mut b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());

        b.set_filter("fd == 3").unwrap();
        assert_ne!(a, b);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_legacy_event() {
        let mut rule = SyscallRule::new();
        rule.set_pattern("openat").unwrap();
        let event = rule.generate_lttng_event().unwrap();
        assert_eq!(event.event_type, LegacyEventType::Syscall);
        assert_eq!(event.name(), "openat");
        assert_eq!(event.loglevel_type, LogLevelType::All);
    }

    #[test]
    fn test_truncated_header() {
        let data = [0u8; HEADER_LEN - 1];
        assert!(matches!(
            SyscallRule::create_from_payload(PayloadView::new(&data)),
            Err(PayloadError::Truncated { .. })
        ));
    }
}
