//! Userspace probe rules

use serde::Serialize;
use tracing::error;

use super::kernel_probe::{checked_name, probe_event, probe_hash, serialize_probe, PROBE_HEADER_LEN};
use super::EventRuleKind;
use crate::error::{GenerateError, PayloadError, RuleError};
use crate::protocol::{Payload, PayloadView};
use crate::types::legacy::{LegacyEvent, LegacyEventType};
use crate::types::location::UserspaceProbeLocation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserspaceProbeRule {
    location: UserspaceProbeLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl UserspaceProbeRule {
    pub fn new(location: UserspaceProbeLocation) -> Self {
        Self {
            location,
            name: None,
        }
    }

    pub fn location(&self) -> &UserspaceProbeLocation {
        &self.location
    }

    pub fn event_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_event_name(&mut self, name: &str) -> Result<(), RuleError> {
        self.name = Some(checked_name(name)?);
        Ok(())
    }

    pub fn validate(&self) -> bool {
        if self.name.is_none() {
            error!("Invalid userspace probe event rule: a name must be set");
            return false;
        }
        true
    }

    pub fn serialize(&self, payload: &mut Payload) -> Result<(), PayloadError> {
        serialize_probe(self.event_name(), payload, |location| {
            self.location.serialize(location)
        })
    }

    pub fn create_from_payload(view: PayloadView<'_>) -> Result<(Self, usize), PayloadError> {
        let mut cursor = view.cursor();
        let mut header = cursor
            .take_view("userspace probe event rule header", PROBE_HEADER_LEN)?
            .cursor();
        let name_len = header.read_len("probe name length")?;
        let location_len = header.read_len("probe location length")?;

        let name = cursor.read_opt_cstr("probe name", name_len)?;
        let location_block = cursor.take_view("userspace probe location", location_len)?;
        let (location, consumed) = UserspaceProbeLocation::create_from_payload(location_block)?;
        if consumed != location_len {
            return Err(PayloadError::LengthMismatch {
                what: "userspace probe location",
                declared: location_len,
                consumed,
            });
        }

        let mut rule = UserspaceProbeRule::new(location);
        if let Some(name) = name {
            rule.set_event_name(name)
                .map_err(|source| PayloadError::Rejected {
                    what: "probe name",
                    source,
                })?;
        }
        Ok((rule, cursor.consumed()))
    }

    pub fn hash(&self) -> u64 {
        probe_hash(EventRuleKind::UserspaceProbe, self.event_name()) ^ self.location.hash()
    }

    pub fn generate_lttng_event(&self) -> Result<LegacyEvent, GenerateError> {
        probe_event(LegacyEventType::UserspaceProbe, self.event_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::location::UserspaceProbeLookup;

    fn uprobe() -> UserspaceProbeRule {
        let location = UserspaceProbeLocation::function(
            "/proc/self/exe",
            "process_request",
            UserspaceProbeLookup::FunctionElf,
        )
        .unwrap();
        UserspaceProbeRule::new(location)
    }

    #[test]
    fn test_round_trip() {
        let mut rule = uprobe();
        rule.set_event_name("my_uprobe").unwrap();

        let mut payload = Payload::new();
        rule.serialize(&mut payload).unwrap();
        let (decoded, consumed) = UserspaceProbeRule::create_from_payload(payload.view()).unwrap();
        assert_eq!(decoded, rule);
        assert_eq!(decoded.hash(), rule.hash());
        assert_eq!(consumed, payload.len());
    }

    #[test]
    fn test_sdt_round_trip() {
        let location =
            UserspaceProbeLocation::tracepoint("/usr/bin/app", "provider", "probe").unwrap();
        let mut rule = UserspaceProbeRule::new(location);
        rule.set_event_name("sdt").unwrap();

        let mut payload = Payload::new();
        rule.serialize(&mut payload).unwrap();
        let (decoded, _) = UserspaceProbeRule::create_from_payload(payload.view()).unwrap();
        assert_eq!(decoded, rule);
    }

    #[test]
    fn test_name_setter() {
        let mut rule = uprobe();
        assert_eq!(rule.set_event_name(""), Err(RuleError::Invalid));
        assert!(!rule.validate());
        rule.set_event_name("my_uprobe").unwrap();
        assert_eq!(rule.event_name(), Some("my_uprobe"));
        assert_eq!(
            rule.generate_lttng_event().unwrap().event_type,
            LegacyEventType::UserspaceProbe
        );
    }
}
