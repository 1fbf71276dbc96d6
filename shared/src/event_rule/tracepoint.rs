//! Tracepoint rules
//!
//! Matches instrumentation points by name pattern within one tracing domain.
//! Agent domains (JUL, log4j, Python) have no native filter support on the
//! tracer side, so their logger name and log level constraints are folded
//! into a synthesized filter expression before compilation.

use serde::Serialize;
use tracing::{debug, error, warn};

use super::{compile_filter, EventRuleKind};
use crate::bytecode::{BytecodeCompiler, Credentials, InternalFilter};
use crate::error::{FilterError, GenerateError, PayloadError, RuleError};
use crate::log_level_rule::LogLevelRule;
use crate::protocol::payload::{cstr_len, is_wire_string, opt_cstr_len, wire_len};
use crate::protocol::{Payload, PayloadView, SYMBOL_NAME_LEN};
use crate::types::domain::DomainType;
use crate::types::legacy::{symbol_name, EventExclusion, LegacyEvent, LegacyEventType, LogLevelType};
use crate::types::loglevel::{UST_LOGLEVEL_DEBUG, UST_LOGLEVEL_EMERG};
use crate::utils::hash::{hash_key_str, hash_key_u64};

/// `{ domain: i8, pattern_len, filter_len, loglevel_block_len, exclusion_count, exclusions_block_len: u32 }`
const HEADER_LEN: usize = 1 + 5 * 4;

/// Smallest encoded exclusion: a length field and an empty terminated string.
const MIN_EXCLUSION_LEN: usize = 4 + 1;

/// Pattern matching every event of the domain.
pub const MATCH_ALL: &str = "*";

#[derive(Debug, Clone, Serialize)]
pub struct TracepointRule {
    domain: DomainType,
    pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level_rule: Option<LogLevelRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclusions: Vec<String>,
    #[serde(skip)]
    internal_filter: Option<InternalFilter>,
}

impl TracepointRule {
    /// A rule matching every event of `domain`.
    pub fn new(domain: DomainType) -> Self {
        Self {
            domain,
            pattern: MATCH_ALL.to_string(),
            filter_expression: None,
            log_level_rule: None,
            exclusions: Vec::new(),
            internal_filter: None,
        }
    }

    pub fn domain(&self) -> DomainType {
        self.domain
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

    /// User filter expression, as set. See [`generate_agent_filter`](Self::generate_agent_filter)
    /// for what agent domains actually compile.
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

    pub fn log_level_rule(&self) -> Option<&LogLevelRule> {
        self.log_level_rule.as_ref()
    }

    /// Attach a log level rule. The kernel domain has no log levels; UST
    /// levels must lie within the tracer's severity range. Agent domains
    /// accept any value.
    pub fn set_log_level_rule(&mut self, rule: &LogLevelRule) -> Result<(), RuleError> {
        if !self.domain.supports_log_levels() {
            return Err(RuleError::Unsupported);
        }
        if !log_level_valid(self.domain, rule.level()) {
            return Err(RuleError::Invalid);
        }
        self.log_level_rule = Some(*rule);
        Ok(())
    }

    /// Exclude event names from the pattern's matches. UST only; each name
    /// must fit in a symbol name slot with its terminator.
    pub fn add_exclusion(&mut self, exclusion: &str) -> Result<(), RuleError> {
        if !is_wire_string(exclusion) || exclusion.len() >= SYMBOL_NAME_LEN {
            return Err(RuleError::Invalid);
        }
        if !self.domain.supports_exclusions() {
            return Err(RuleError::Unsupported);
        }
        self.exclusions.push(exclusion.to_string());
        Ok(())
    }

    pub fn exclusions_count(&self) -> usize {
        self.exclusions.len()
    }

    pub fn exclusion_at(&self, index: usize) -> Option<&str> {
        self.exclusions.get(index).map(String::as_str)
    }

    pub fn internal_filter(&self) -> Option<&InternalFilter> {
        self.internal_filter.as_ref()
    }

    pub fn validate(&self) -> bool {
        if !is_wire_string(&self.pattern) {
            error!("Invalid tracepoint event rule: a pattern must be set");
            return false;
        }
        if self.filter_expression.as_deref() == Some("") {
            error!("Invalid tracepoint event rule: filter expression is empty");
            return false;
        }
        true
    }

    pub fn serialize(&self, payload: &mut Payload) -> Result<(), PayloadError> {
        let pattern_len = cstr_len("tracepoint pattern", &self.pattern)?;
        let filter_len = opt_cstr_len("tracepoint filter expression", self.filter_expression())?;

        let mut log_level_block = Payload::new();
        LogLevelRule::serialize_opt(self.log_level_rule.as_ref(), &mut log_level_block);
        let log_level_len = wire_len("log level rule", log_level_block.len())?;

        let mut exclusions_block = Payload::new();
        for exclusion in &self.exclusions {
            exclusions_block.append_u32(cstr_len("exclusion", exclusion)?);
            exclusions_block.append_cstr(exclusion);
        }
        let exclusion_count = wire_len("exclusion count", self.exclusions.len())?;
        let exclusions_len = wire_len("exclusions", exclusions_block.len())?;

        debug!(
            "Serializing tracepoint event rule: pattern = '{}', exclusions = {}",
            self.pattern, exclusion_count
        );

        payload.append_i8(self.domain.as_raw());
        payload.append_u32(pattern_len);
        payload.append_u32(filter_len);
        payload.append_u32(log_level_len);
        payload.append_u32(exclusion_count);
        payload.append_u32(exclusions_len);
        payload.append_cstr(&self.pattern);
        payload.append_opt_cstr(self.filter_expression());
        payload.append_payload(&log_level_block);
        payload.append_payload(&exclusions_block);
        Ok(())
    }

    /// Decode a rule body (after the kind header), returning it with the
    /// number of bytes consumed. Every field is decoded before the rule is
    /// assembled through its setters.
    pub fn create_from_payload(view: PayloadView<'_>) -> Result<(Self, usize), PayloadError> {
        let mut cursor = view.cursor();

        let mut header = cursor.take_view("tracepoint event rule header", HEADER_LEN)?.cursor();
        let raw_domain = header.read_i8("domain type")?;
        let pattern_len = header.read_len("pattern length")?;
        let filter_len = header.read_len("filter expression length")?;
        let log_level_len = header.read_len("log level rule length")?;
        let exclusion_count = header.read_len("exclusion count")?;
        let exclusions_len = header.read_len("exclusions length")?;

        let domain = DomainType::from_raw(raw_domain).ok_or_else(|| {
            error!("Invalid domain type value ({}) found in payload", raw_domain);
            PayloadError::UnknownDomain(raw_domain)
        })?;

        let pattern = cursor.read_cstr("tracepoint pattern", pattern_len)?;
        let filter = cursor.read_opt_cstr("tracepoint filter expression", filter_len)?;

        let log_level_rule = if log_level_len == 0 {
            None
        } else {
            let block = cursor.take_view("log level rule", log_level_len)?;
            let (rule, consumed) = LogLevelRule::create_from_payload(block)?;
            if consumed != log_level_len {
                return Err(PayloadError::LengthMismatch {
                    what: "log level rule",
                    declared: log_level_len,
                    consumed,
                });
            }
            Some(rule)
        };

        let mut exclusions_cursor = cursor.take_view("exclusions", exclusions_len)?.cursor();
        let mut exclusions =
            Vec::with_capacity(exclusion_count.min(exclusions_len / MIN_EXCLUSION_LEN));
        for _ in 0..exclusion_count {
            let len = exclusions_cursor.read_len("exclusion length")?;
            exclusions.push(exclusions_cursor.read_cstr("exclusion", len)?);
        }
        if exclusions_cursor.remaining() != 0 {
            return Err(PayloadError::LengthMismatch {
                what: "exclusions",
                declared: exclusions_len,
                consumed: exclusions_cursor.consumed(),
            });
        }

        let mut rule = TracepointRule::new(domain);
        rule.set_pattern(pattern)
            .map_err(|source| rejected("tracepoint pattern", source))?;
        if let Some(filter) = filter {
            rule.set_filter(filter)
                .map_err(|source| rejected("tracepoint filter expression", source))?;
        }
        if let Some(log_level_rule) = &log_level_rule {
            rule.set_log_level_rule(log_level_rule)
                .map_err(|source| rejected("log level rule", source))?;
        }
        for exclusion in exclusions {
            rule.add_exclusion(exclusion)
                .map_err(|source| rejected("exclusion", source))?;
        }

        Ok((rule, cursor.consumed()))
    }

    /// Exclusions contribute by XOR, so rules whose exclusions only differ in
    /// order hash the same while comparing unequal.
    pub fn hash(&self) -> u64 {
        let mut hash = hash_key_u64(EventRuleKind::Tracepoint.as_raw() as u64)
            ^ hash_key_u64(self.domain.as_raw() as u64)
            ^ hash_key_str(&self.pattern);

        if let Some(filter) = &self.filter_expression {
            hash ^= hash_key_str(filter);
        }
        if let Some(rule) = &self.log_level_rule {
            hash ^= rule.hash();
        }
        for exclusion in &self.exclusions {
            hash ^= hash_key_str(exclusion);
        }
        hash
    }

    /// Filter text for agent domains: the logger name pattern and the log
    /// level rule expressed as conditions on the agent's event fields.
    pub fn generate_agent_filter(&self) -> Option<String> {
        let mut agent_filter = if self.pattern != MATCH_ALL {
            Some(match self.filter_expression() {
                Some(filter) => format!("({}) && (logger_name == \"{}\")", filter, self.pattern),
                None => format!("logger_name == \"{}\"", self.pattern),
            })
        } else {
            self.filter_expression.clone()
        };

        if let Some(rule) = &self.log_level_rule {
            let clause = format!("int_loglevel {} {}", rule.filter_operator(), rule.level());
            agent_filter = Some(match agent_filter {
                Some(filter) => format!("({}) && ({})", filter, clause),
                None => clause,
            });
        }

        agent_filter
    }

    /// Compile the filter for this rule's domain and cache it on the rule.
    pub fn generate_filter_bytecode(
        &mut self,
        creds: &Credentials,
        compiler: &dyn BytecodeCompiler,
    ) -> Result<(), FilterError> {
        if self.filter_expression.as_deref() == Some("") {
            return Err(FilterError::Invalid);
        }

        let source = if self.domain.is_agent() {
            self.generate_agent_filter()
        } else {
            self.filter_expression.clone()
        };

        self.internal_filter = compile_filter(source, creds, compiler)?;
        Ok(())
    }

    pub fn generate_exclusions(&self) -> Result<Option<EventExclusion>, GenerateError> {
        if !self.domain.supports_exclusions() || self.exclusions.is_empty() {
            return Ok(None);
        }

        let mut block = EventExclusion::with_capacity(self.exclusions.len());
        for exclusion in &self.exclusions {
            let slot = symbol_name(exclusion).ok_or_else(|| {
                warn!("Exclusion '{}' does not fit in a symbol name", exclusion);
                GenerateError::ExclusionTooLong(exclusion.clone())
            })?;
            block.push(slot);
        }
        Ok(Some(block))
    }

    pub fn generate_lttng_event(&self) -> Result<LegacyEvent, GenerateError> {
        let name = symbol_name(&self.pattern).ok_or_else(|| {
            error!(
                "Truncation occurred when copying event rule pattern to event: pattern = '{}'",
                self.pattern
            );
            GenerateError::NameTruncated(self.pattern.clone())
        })?;

        let (loglevel_type, loglevel) = match self.log_level_rule {
            None => (LogLevelType::All, 0),
            Some(LogLevelRule::Exactly(level)) => (LogLevelType::Single, level),
            Some(LogLevelRule::AtLeastAsSevereAs(level)) => (LogLevelType::Range, level),
        };

        Ok(LegacyEvent {
            event_type: LegacyEventType::Tracepoint,
            name,
            loglevel_type,
            loglevel,
        })
    }
}

/// Cheap fields first; exclusions compare in stored order.
impl PartialEq for TracepointRule {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.exclusions.len() == other.exclusions.len()
            && self.filter_expression.is_some() == other.filter_expression.is_some()
            && self.pattern == other.pattern
            && self.filter_expression == other.filter_expression
            && self.log_level_rule == other.log_level_rule
            && self.exclusions == other.exclusions
    }
}

impl Eq for TracepointRule {}

fn log_level_valid(domain: DomainType, level: i32) -> bool {
    match domain {
        DomainType::Kernel => false,
        DomainType::Ust => (UST_LOGLEVEL_EMERG..=UST_LOGLEVEL_DEBUG).contains(&level),
        DomainType::Jul | DomainType::Log4j | DomainType::Python => true,
    }
}

fn rejected(what: &'static str, source: RuleError) -> PayloadError {
    PayloadError::Rejected { what, source }
}
