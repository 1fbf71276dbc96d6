//! Kernel probe rules
//!
//! Probe rules carry an event name and a location. Their body is
//! `{ name_len: u32, location_len: u32 }` followed by the name and the
//! location payload; kernel function rules share the same layout.

use serde::Serialize;
use tracing::error;

use super::EventRuleKind;
use crate::error::{GenerateError, PayloadError, RuleError};
use crate::protocol::payload::{is_wire_string, opt_cstr_len, wire_len};
use crate::protocol::{Payload, PayloadView};
use crate::types::legacy::{symbol_name, LegacyEvent, LegacyEventType, LogLevelType};
use crate::types::location::KernelProbeLocation;
use crate::utils::hash::{hash_key_str, hash_key_u64};

/// `{ name_len: u32, location_len: u32 }`
pub(crate) const PROBE_HEADER_LEN: usize = 2 * 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelProbeRule {
    location: KernelProbeLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl KernelProbeRule {
    pub fn new(location: KernelProbeLocation) -> Self {
        Self {
            location,
            name: None,
        }
    }

    pub fn location(&self) -> &KernelProbeLocation {
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
            error!("Invalid kernel probe event rule: a name must be set");
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
            .take_view("kernel probe event rule header", PROBE_HEADER_LEN)?
            .cursor();
        let name_len = header.read_len("probe name length")?;
        let location_len = header.read_len("probe location length")?;

        let name = cursor.read_opt_cstr("probe name", name_len)?;
        let location_block = cursor.take_view("kernel probe location", location_len)?;
        let (location, consumed) = KernelProbeLocation::create_from_payload(location_block)?;
        if consumed != location_len {
            return Err(PayloadError::LengthMismatch {
                what: "kernel probe location",
                declared: location_len,
                consumed,
            });
        }

        let mut rule = KernelProbeRule::new(location);
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
        probe_hash(EventRuleKind::KernelProbe, self.event_name()) ^ self.location.hash()
    }

    pub fn generate_lttng_event(&self) -> Result<LegacyEvent, GenerateError> {
        probe_event(LegacyEventType::Probe, self.event_name())
    }
}

pub(crate) fn checked_name(name: &str) -> Result<String, RuleError> {
    if !is_wire_string(name) {
        return Err(RuleError::Invalid);
    }
    Ok(name.to_string())
}

/// Write a probe body. The location is encoded into its own buffer first so
/// its length is known when the header is written.
pub(crate) fn serialize_probe<F>(
    name: Option<&str>,
    payload: &mut Payload,
    serialize_location: F,
) -> Result<(), PayloadError>
where
    F: FnOnce(&mut Payload) -> Result<(), PayloadError>,
{
    let name_len = opt_cstr_len("probe name", name)?;
    let mut location = Payload::new();
    serialize_location(&mut location)?;
    let location_len = wire_len("probe location", location.len())?;

    payload.append_u32(name_len);
    payload.append_u32(location_len);
    payload.append_opt_cstr(name);
    payload.append_payload(&location);
    Ok(())
}

pub(crate) fn probe_hash(kind: EventRuleKind, name: Option<&str>) -> u64 {
    let hash = hash_key_u64(kind.as_raw() as u64);
    match name {
        Some(name) => hash ^ hash_key_str(name),
        None => hash,
    }
}

pub(crate) fn probe_event(
    event_type: LegacyEventType,
    name: Option<&str>,
) -> Result<LegacyEvent, GenerateError> {
    let name = name.ok_or(GenerateError::MissingName)?;
    let slot = symbol_name(name).ok_or_else(|| GenerateError::NameTruncated(name.to_string()))?;
    Ok(LegacyEvent {
        event_type,
        name: slot,
        loglevel_type: LogLevelType::All,
        loglevel: 0,
    })
}
