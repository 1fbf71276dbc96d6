//! Kernel function rules
//!
//! Encoded like kernel probe rules. Payloads carrying this kind are not
//! accepted on decode.

use serde::Serialize;
use tracing::error;

use super::kernel_probe::{checked_name, probe_event, probe_hash, serialize_probe};
use super::EventRuleKind;
use crate::error::{GenerateError, PayloadError, RuleError};
use crate::protocol::Payload;
use crate::types::legacy::{LegacyEvent, LegacyEventType};
use crate::types::location::KernelProbeLocation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelFunctionRule {
    location: KernelProbeLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl KernelFunctionRule {
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
            error!("Invalid kernel function event rule: a name must be set");
            return false;
        }
        true
    }

    pub fn serialize(&self, payload: &mut Payload) -> Result<(), PayloadError> {
        serialize_probe(self.event_name(), payload, |location| {
            self.location.serialize(location)
        })
    }

    pub fn hash(&self) -> u64 {
        probe_hash(EventRuleKind::KernelFunction, self.event_name()) ^ self.location.hash()
    }

    pub fn generate_lttng_event(&self) -> Result<LegacyEvent, GenerateError> {
        probe_event(LegacyEventType::Function, self.event_name())
    }
}
