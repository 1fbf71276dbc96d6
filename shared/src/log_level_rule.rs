//! Log level rules
//!
//! A log level rule is a predicate on event severity: either an exact level
//! or a threshold ("at least as severe as"). The level is interpreted by the
//! domain of the rule that carries it.

use serde::Serialize;

use crate::error::PayloadError;
use crate::protocol::{Payload, PayloadView};
use crate::utils::hash::hash_key_u64;

/// Severity predicate attached to a tracepoint rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "level", rename_all = "snake_case")]
pub enum LogLevelRule {
    Exactly(i32),
    AtLeastAsSevereAs(i32),
}

impl LogLevelRule {
    const EXACTLY: i8 = 0;
    const AT_LEAST_AS_SEVERE_AS: i8 = 1;

    /// Size of the encoded rule: `{ kind: i8, level: i32 }`.
    pub const ENCODED_LEN: usize = 5;

    pub fn level(&self) -> i32 {
        match self {
            LogLevelRule::Exactly(level) | LogLevelRule::AtLeastAsSevereAs(level) => *level,
        }
    }

    fn raw_kind(&self) -> i8 {
        match self {
            LogLevelRule::Exactly(_) => Self::EXACTLY,
            LogLevelRule::AtLeastAsSevereAs(_) => Self::AT_LEAST_AS_SEVERE_AS,
        }
    }

    /// Comparison operator used when the rule is expressed as filter text.
    pub fn filter_operator(&self) -> &'static str {
        match self {
            LogLevelRule::Exactly(_) => "==",
            LogLevelRule::AtLeastAsSevereAs(_) => ">=",
        }
    }

    pub fn serialize(&self, payload: &mut Payload) {
        payload.append_i8(self.raw_kind());
        payload.append_i32(self.level());
    }

    /// Encode an optional rule; an absent rule produces no bytes at all.
    pub fn serialize_opt(rule: Option<&LogLevelRule>, payload: &mut Payload) {
        if let Some(rule) = rule {
            rule.serialize(payload);
        }
    }

    /// Decode a rule, returning it with the number of bytes consumed.
    pub fn create_from_payload(view: PayloadView<'_>) -> Result<(Self, usize), PayloadError> {
        let mut cursor = view.cursor();
        let kind = cursor.read_i8("log level rule header")?;
        let level = cursor.read_i32("log level")?;

        let rule = match kind {
            Self::EXACTLY => LogLevelRule::Exactly(level),
            Self::AT_LEAST_AS_SEVERE_AS => LogLevelRule::AtLeastAsSevereAs(level),
            other => return Err(PayloadError::UnknownLogLevelRuleKind(other)),
        };
        Ok((rule, cursor.consumed()))
    }

    pub fn hash(&self) -> u64 {
        hash_key_u64(self.raw_kind() as u64) ^ hash_key_u64(self.level() as u32 as u64)
    }
}

impl std::fmt::Display for LogLevelRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevelRule::Exactly(level) => write!(f, "exactly {}", level),
            LogLevelRule::AtLeastAsSevereAs(level) => write!(f, "at least as severe as {}", level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for rule in [
            LogLevelRule::Exactly(6),
            LogLevelRule::AtLeastAsSevereAs(i32::MIN),
            LogLevelRule::AtLeastAsSevereAs(i32::MAX),
        ] {
            let mut payload = Payload::new();
            rule.serialize(&mut payload);
            assert_eq!(payload.len(), LogLevelRule::ENCODED_LEN);

            let (decoded, consumed) = LogLevelRule::create_from_payload(payload.view()).unwrap();
            assert_eq!(decoded, rule);
            assert_eq!(consumed, LogLevelRule::ENCODED_LEN);
        }
    }

    #[test]
    fn test_absent_rule_encodes_nothing() {
        let mut payload = Payload::new();
        LogLevelRule::serialize_opt(None, &mut payload);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut payload = Payload::new();
        payload.append_i8(9);
        payload.append_i32(0);
        assert_eq!(
            LogLevelRule::create_from_payload(payload.view()).unwrap_err(),
            PayloadError::UnknownLogLevelRuleKind(9)
        );
    }

    #[test]
    fn test_truncated_rule_rejected() {
        let mut payload = Payload::new();
        LogLevelRule::Exactly(3).serialize(&mut payload);
        for len in 0..LogLevelRule::ENCODED_LEN {
            let view = PayloadView::new(&payload.as_bytes()[..len]);
            assert!(LogLevelRule::create_from_payload(view).is_err());
        }
    }

    #[test]
    fn test_kind_participates_in_equality_and_hash() {
        let exactly = LogLevelRule::Exactly(3);
        let threshold = LogLevelRule::AtLeastAsSevereAs(3);
        assert_ne!(exactly, threshold);
        assert_ne!(exactly.hash(), threshold.hash());
        assert_eq!(exactly.hash(), LogLevelRule::Exactly(3).hash());
    }

    #[test]
    fn test_filter_operator() {
        assert_eq!(LogLevelRule::Exactly(1).filter_operator(), "==");
        assert_eq!(LogLevelRule::AtLeastAsSevereAs(1).filter_operator(), ">=");
    }
}
