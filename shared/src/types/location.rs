//! Kernel and userspace probe locations

use serde::Serialize;

use crate::error::{PayloadError, RuleError};
use crate::protocol::payload::{cstr_len, is_wire_string};
use crate::protocol::{Payload, PayloadView};
use crate::utils::hash::{hash_key_str, hash_key_u64};

/// Where a kernel probe is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelProbeLocation {
    Address { address: u64 },
    SymbolOffset { symbol: String, offset: u64 },
}

impl KernelProbeLocation {
    const ADDRESS: i8 = 0;
    const SYMBOL_OFFSET: i8 = 1;

    pub fn address(address: u64) -> Self {
        KernelProbeLocation::Address { address }
    }

    pub fn symbol(symbol: &str, offset: u64) -> Result<Self, RuleError> {
        if !is_wire_string(symbol) {
            return Err(RuleError::Invalid);
        }
        Ok(KernelProbeLocation::SymbolOffset {
            symbol: symbol.to_string(),
            offset,
        })
    }

    pub fn serialize(&self, payload: &mut Payload) -> Result<(), PayloadError> {
        match self {
            KernelProbeLocation::Address { address } => {
                payload.append_i8(Self::ADDRESS);
                payload.append_u64(*address);
            }
            KernelProbeLocation::SymbolOffset { symbol, offset } => {
                let symbol_len = cstr_len("probe symbol", symbol)?;
                payload.append_i8(Self::SYMBOL_OFFSET);
                payload.append_u32(symbol_len);
                payload.append_u64(*offset);
                payload.append_cstr(symbol);
            }
        }
        Ok(())
    }

    /// Decode a location, returning it with the number of bytes consumed.
    pub fn create_from_payload(view: PayloadView<'_>) -> Result<(Self, usize), PayloadError> {
        let mut cursor = view.cursor();
        let location = match cursor.read_i8("kernel probe location header")? {
            Self::ADDRESS => KernelProbeLocation::Address {
                address: cursor.read_u64("probe address")?,
            },
            Self::SYMBOL_OFFSET => {
                let symbol_len = cursor.read_len("probe symbol length")?;
                let offset = cursor.read_u64("probe offset")?;
                let symbol = cursor.read_cstr("probe symbol", symbol_len)?;
                KernelProbeLocation::SymbolOffset {
                    symbol: symbol.to_string(),
                    offset,
                }
            }
            value => {
                return Err(PayloadError::UnknownLocationKind {
                    what: "kernel probe location",
                    value,
                })
            }
        };
        Ok((location, cursor.consumed()))
    }

    pub fn hash(&self) -> u64 {
        match self {
            KernelProbeLocation::Address { address } => {
                hash_key_u64(Self::ADDRESS as u64) ^ hash_key_u64(*address)
            }
            KernelProbeLocation::SymbolOffset { symbol, offset } => {
                hash_key_u64(Self::SYMBOL_OFFSET as u64)
                    ^ hash_key_str(symbol)
                    ^ hash_key_u64(*offset)
            }
        }
    }
}

/// How the probed address is resolved inside the target binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserspaceProbeLookup {
    FunctionDefault,
    FunctionElf,
    TracepointSdt,
}

impl UserspaceProbeLookup {
    fn as_raw(self) -> i8 {
        match self {
            UserspaceProbeLookup::FunctionDefault => 0,
            UserspaceProbeLookup::FunctionElf => 1,
            UserspaceProbeLookup::TracepointSdt => 2,
        }
    }

    fn from_raw(raw: i8) -> Option<Self> {
        match raw {
            0 => Some(UserspaceProbeLookup::FunctionDefault),
            1 => Some(UserspaceProbeLookup::FunctionElf),
            2 => Some(UserspaceProbeLookup::TracepointSdt),
            _ => None,
        }
    }
}

/// Where a userspace probe is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserspaceProbeLocation {
    Function {
        binary_path: String,
        function_name: String,
        lookup: UserspaceProbeLookup,
    },
    Tracepoint {
        binary_path: String,
        provider_name: String,
        probe_name: String,
    },
}

impl UserspaceProbeLocation {
    const FUNCTION: i8 = 0;
    const TRACEPOINT: i8 = 1;

    /// Function entry in an ELF binary. `lookup` must be a function lookup.
    pub fn function(
        binary_path: &str,
        function_name: &str,
        lookup: UserspaceProbeLookup,
    ) -> Result<Self, RuleError> {
        if !is_wire_string(binary_path) || !is_wire_string(function_name) {
            return Err(RuleError::Invalid);
        }
        if lookup == UserspaceProbeLookup::TracepointSdt {
            return Err(RuleError::Invalid);
        }
        Ok(UserspaceProbeLocation::Function {
            binary_path: binary_path.to_string(),
            function_name: function_name.to_string(),
            lookup,
        })
    }

    /// SDT tracepoint in a binary.
    pub fn tracepoint(
        binary_path: &str,
        provider_name: &str,
        probe_name: &str,
    ) -> Result<Self, RuleError> {
        if [binary_path, provider_name, probe_name]
            .iter()
            .any(|s| !is_wire_string(s))
        {
            return Err(RuleError::Invalid);
        }
        Ok(UserspaceProbeLocation::Tracepoint {
            binary_path: binary_path.to_string(),
            provider_name: provider_name.to_string(),
            probe_name: probe_name.to_string(),
        })
    }

    pub fn binary_path(&self) -> &str {
        match self {
            UserspaceProbeLocation::Function { binary_path, .. }
            | UserspaceProbeLocation::Tracepoint { binary_path, .. } => binary_path,
        }
    }

    pub fn lookup(&self) -> UserspaceProbeLookup {
        match self {
            UserspaceProbeLocation::Function { lookup, .. } => *lookup,
            UserspaceProbeLocation::Tracepoint { .. } => UserspaceProbeLookup::TracepointSdt,
        }
    }

    pub fn serialize(&self, payload: &mut Payload) -> Result<(), PayloadError> {
        match self {
            UserspaceProbeLocation::Function {
                binary_path,
                function_name,
                ..
            } => {
                let function_len = cstr_len("probe function name", function_name)?;
                let binary_len = cstr_len("probe binary path", binary_path)?;
                payload.append_i8(Self::FUNCTION);
                payload.append_u32(function_len);
                payload.append_u32(binary_len);
                payload.append_cstr(function_name);
                payload.append_cstr(binary_path);
            }
            UserspaceProbeLocation::Tracepoint {
                binary_path,
                provider_name,
                probe_name,
            } => {
                let provider_len = cstr_len("probe provider name", provider_name)?;
                let probe_len = cstr_len("probe name", probe_name)?;
                let binary_len = cstr_len("probe binary path", binary_path)?;
                payload.append_i8(Self::TRACEPOINT);
                payload.append_u32(provider_len);
                payload.append_u32(probe_len);
                payload.append_u32(binary_len);
                payload.append_cstr(provider_name);
                payload.append_cstr(probe_name);
                payload.append_cstr(binary_path);
            }
        }
        payload.append_i8(self.lookup().as_raw());
        Ok(())
    }

    /// Decode a location, returning it with the number of bytes consumed.
    pub fn create_from_payload(view: PayloadView<'_>) -> Result<(Self, usize), PayloadError> {
        let mut cursor = view.cursor();
        let location = match cursor.read_i8("userspace probe location header")? {
            Self::FUNCTION => {
                let function_len = cursor.read_len("probe function name length")?;
                let binary_len = cursor.read_len("probe binary path length")?;
                let function_name = cursor.read_cstr("probe function name", function_len)?;
                let binary_path = cursor.read_cstr("probe binary path", binary_len)?;
                let lookup = read_lookup(&mut cursor)?;
                Self::function(binary_path, function_name, lookup).map_err(|source| {
                    PayloadError::Rejected {
                        what: "userspace probe location",
                        source,
                    }
                })?
            }
            Self::TRACEPOINT => {
                let provider_len = cursor.read_len("probe provider name length")?;
                let probe_len = cursor.read_len("probe name length")?;
                let binary_len = cursor.read_len("probe binary path length")?;
                let provider_name = cursor.read_cstr("probe provider name", provider_len)?;
                let probe_name = cursor.read_cstr("probe name", probe_len)?;
                let binary_path = cursor.read_cstr("probe binary path", binary_len)?;
                if read_lookup(&mut cursor)? != UserspaceProbeLookup::TracepointSdt {
                    return Err(PayloadError::Rejected {
                        what: "userspace probe lookup method",
                        source: RuleError::Invalid,
                    });
                }
                Self::tracepoint(binary_path, provider_name, probe_name)
                    .map_err(|source| PayloadError::Rejected {
                        what: "userspace probe location",
                        source,
                    })?
            }
            value => {
                return Err(PayloadError::UnknownLocationKind {
                    what: "userspace probe location",
                    value,
                })
            }
        };
        Ok((location, cursor.consumed()))
    }

    pub fn hash(&self) -> u64 {
        match self {
            UserspaceProbeLocation::Function {
                binary_path,
                function_name,
                lookup,
            } => {
                hash_key_u64(Self::FUNCTION as u64)
                    ^ hash_key_str(binary_path)
                    ^ hash_key_str(function_name)
                    ^ hash_key_u64(lookup.as_raw() as u64)
            }
            UserspaceProbeLocation::Tracepoint {
                binary_path,
                provider_name,
                probe_name,
            } => {
                hash_key_u64(Self::TRACEPOINT as u64)
                    ^ hash_key_str(binary_path)
                    ^ hash_key_str(provider_name)
                    ^ hash_key_str(probe_name)
            }
        }
    }
}

fn read_lookup(
    cursor: &mut crate::protocol::PayloadCursor<'_>,
) -> Result<UserspaceProbeLookup, PayloadError> {
    let raw = cursor.read_i8("probe lookup method")?;
    UserspaceProbeLookup::from_raw(raw).ok_or(PayloadError::UnknownLocationKind {
        what: "userspace probe lookup method",
        value: raw,
    })
}
