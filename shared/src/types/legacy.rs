//! Fixed-size descriptors handed to tracers that predate event rules
//!
//! Tracer registration still works with the classic event structure: a
//! name in a fixed symbol-sized slot plus a `{type, value}` log level pair,
//! and exclusions as an array of fixed-size name slots.

use serde::Serialize;

use crate::protocol::SYMBOL_NAME_LEN;

/// Instrumentation type of a legacy event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyEventType {
    Tracepoint,
    Syscall,
    Probe,
    Function,
    UserspaceProbe,
}

/// How a legacy event interprets its log level value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevelType {
    /// Any level matches; the value is ignored.
    All,
    /// The level and every more severe one match.
    Range,
    /// Only the exact level matches.
    Single,
}

/// Fixed-size symbol name slot, NUL-padded.
pub type SymbolName = [u8; SYMBOL_NAME_LEN];

/// Copy `name` into a symbol slot. Fails when the name and its terminator
/// do not fit: names are never silently clipped.
pub fn symbol_name(name: &str) -> Option<SymbolName> {
    if name.len() >= SYMBOL_NAME_LEN {
        return None;
    }
    let mut slot = [0u8; SYMBOL_NAME_LEN];
    slot[..name.len()].copy_from_slice(name.as_bytes());
    Some(slot)
}

/// Text stored in a symbol slot, up to the first NUL.
pub fn symbol_str(slot: &SymbolName) -> &str {
    let end = slot.iter().position(|b| *b == 0).unwrap_or(slot.len());
    std::str::from_utf8(&slot[..end]).unwrap_or("")
}

/// Legacy event descriptor derived from an event rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyEvent {
    pub event_type: LegacyEventType,
    pub name: SymbolName,
    pub loglevel_type: LogLevelType,
    pub loglevel: i32,
}

impl LegacyEvent {
    pub fn name(&self) -> &str {
        symbol_str(&self.name)
    }
}

/// Exclusion block: one fixed-size name slot per excluded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventExclusion {
    names: Vec<SymbolName>,
}

impl EventExclusion {
    pub(crate) fn with_capacity(count: usize) -> Self {
        Self {
            names: Vec::with_capacity(count),
        }
    }

    pub(crate) fn push(&mut self, name: SymbolName) {
        self.names.push(name);
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(symbol_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(symbol_str)
    }

    /// Raw slots, laid out back to back as the tracer expects them.
    pub fn as_slots(&self) -> &[SymbolName] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_name_bounds() {
        let fits = "a".repeat(SYMBOL_NAME_LEN - 1);
        let slot = symbol_name(&fits).unwrap();
        assert_eq!(symbol_str(&slot), fits);

        let too_long = "a".repeat(SYMBOL_NAME_LEN);
        assert!(symbol_name(&too_long).is_none());
    }

    #[test]
    fn test_exclusion_block() {
        let mut exclusions = EventExclusion::with_capacity(2);
        exclusions.push(symbol_name("first").unwrap());
        exclusions.push(symbol_name("second").unwrap());
        assert_eq!(exclusions.count(), 2);
        assert_eq!(exclusions.name_at(1), Some("second"));
        assert_eq!(exclusions.name_at(2), None);
        assert_eq!(exclusions.names().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(exclusions.as_slots().len(), 2);
    }
}
