//! Named log levels per tracing domain
//!
//! Levels are plain `i32` values interpreted by each domain. The tables below
//! name the well-known values; agent domains also accept any other value as a
//! custom level.

use super::domain::DomainType;

/// Most severe UST level.
pub const UST_LOGLEVEL_EMERG: i32 = 0;
/// Most verbose UST level.
pub const UST_LOGLEVEL_DEBUG: i32 = 14;

pub const UST_LOGLEVELS: &[(&str, i32)] = &[
    ("EMERG", 0),
    ("ALERT", 1),
    ("CRIT", 2),
    ("ERR", 3),
    ("WARNING", 4),
    ("NOTICE", 5),
    ("INFO", 6),
    ("DEBUG_SYSTEM", 7),
    ("DEBUG_PROGRAM", 8),
    ("DEBUG_PROCESS", 9),
    ("DEBUG_MODULE", 10),
    ("DEBUG_UNIT", 11),
    ("DEBUG_FUNCTION", 12),
    ("DEBUG_LINE", 13),
    ("DEBUG", 14),
];

pub const JUL_LOGLEVELS: &[(&str, i32)] = &[
    ("OFF", i32::MAX),
    ("SEVERE", 1000),
    ("WARNING", 900),
    ("INFO", 800),
    ("CONFIG", 700),
    ("FINE", 500),
    ("FINER", 400),
    ("FINEST", 300),
    ("ALL", i32::MIN),
];

pub const LOG4J_LOGLEVELS: &[(&str, i32)] = &[
    ("OFF", i32::MAX),
    ("FATAL", 50000),
    ("ERROR", 40000),
    ("WARN", 30000),
    ("INFO", 20000),
    ("DEBUG", 10000),
    ("TRACE", 5000),
    ("ALL", i32::MIN),
];

pub const PYTHON_LOGLEVELS: &[(&str, i32)] = &[
    ("CRITICAL", 50),
    ("ERROR", 40),
    ("WARNING", 30),
    ("INFO", 20),
    ("DEBUG", 10),
    ("NOTSET", 0),
];

/// Named levels of a domain; empty for the kernel.
pub fn loglevels(domain: DomainType) -> &'static [(&'static str, i32)] {
    match domain {
        DomainType::Kernel => &[],
        DomainType::Ust => UST_LOGLEVELS,
        DomainType::Jul => JUL_LOGLEVELS,
        DomainType::Log4j => LOG4J_LOGLEVELS,
        DomainType::Python => PYTHON_LOGLEVELS,
    }
}

fn domain_prefix(domain: DomainType) -> &'static str {
    match domain {
        DomainType::Kernel => "",
        DomainType::Ust => "TRACE_",
        DomainType::Jul => "JUL_",
        DomainType::Log4j => "LOG4J_",
        DomainType::Python => "PYTHON_",
    }
}

/// Resolve a level name (case-insensitive, optional domain prefix such as
/// `TRACE_` or `JUL_`) or a decimal value.
pub fn loglevel_from_name(domain: DomainType, name: &str) -> Option<i32> {
    if let Ok(value) = name.trim().parse::<i32>() {
        return Some(value);
    }

    let upper = name.trim().to_uppercase();
    let bare = upper.strip_prefix(domain_prefix(domain)).unwrap_or(&upper);

    loglevels(domain)
        .iter()
        .find(|(level_name, _)| *level_name == bare)
        .map(|(_, value)| *value)
}

/// Name of a well-known level, if any.
pub fn loglevel_name(domain: DomainType, value: i32) -> Option<&'static str> {
    loglevels(domain)
        .iter()
        .find(|(_, level)| *level == value)
        .map(|(name, _)| *name)
}
