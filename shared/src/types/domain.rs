//! Tracing domains

use serde::Serialize;
use thiserror::Error;

/// Tracer domain an event rule applies to.
///
/// JUL, LOG4J and Python are *agent* domains: their events reach the tracer
/// through a logging bridge and are matched with synthesized filters rather
/// than native name and level checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    Kernel,
    Ust,
    Jul,
    Log4j,
    Python,
}

impl DomainType {
    pub const ALL: [DomainType; 5] = [
        DomainType::Kernel,
        DomainType::Ust,
        DomainType::Jul,
        DomainType::Log4j,
        DomainType::Python,
    ];

    /// Wire value of the domain.
    pub fn as_raw(self) -> i8 {
        match self {
            DomainType::Kernel => 1,
            DomainType::Ust => 2,
            DomainType::Jul => 3,
            DomainType::Log4j => 4,
            DomainType::Python => 5,
        }
    }

    /// Domain for a wire value; `None` for "no domain" (0) and unknown values.
    pub fn from_raw(raw: i8) -> Option<Self> {
        match raw {
            1 => Some(DomainType::Kernel),
            2 => Some(DomainType::Ust),
            3 => Some(DomainType::Jul),
            4 => Some(DomainType::Log4j),
            5 => Some(DomainType::Python),
            _ => None,
        }
    }

    pub fn is_agent(self) -> bool {
        matches!(self, DomainType::Jul | DomainType::Log4j | DomainType::Python)
    }

    pub fn supports_log_levels(self) -> bool {
        !matches!(self, DomainType::Kernel)
    }

    pub fn supports_exclusions(self) -> bool {
        matches!(self, DomainType::Ust)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DomainType::Kernel => "kernel",
            DomainType::Ust => "ust",
            DomainType::Jul => "jul",
            DomainType::Log4j => "log4j",
            DomainType::Python => "python",
        }
    }
}

impl std::fmt::Display for DomainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid domain: {0}")]
pub struct ParseDomainError(String);

impl std::str::FromStr for DomainType {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kernel" | "k" => Ok(DomainType::Kernel),
            "ust" | "userspace" | "u" => Ok(DomainType::Ust),
            "jul" | "j" => Ok(DomainType::Jul),
            "log4j" | "l" => Ok(DomainType::Log4j),
            "python" | "p" => Ok(DomainType::Python),
            _ => Err(ParseDomainError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values_round_trip() {
        for domain in DomainType::ALL {
            assert_eq!(DomainType::from_raw(domain.as_raw()), Some(domain));
        }
        assert_eq!(DomainType::from_raw(0), None);
        assert_eq!(DomainType::from_raw(6), None);
        assert_eq!(DomainType::from_raw(-1), None);
    }

    #[test]
    fn test_domain_capabilities() {
        assert!(!DomainType::Kernel.supports_log_levels());
        assert!(DomainType::Ust.supports_log_levels());
        assert!(DomainType::Ust.supports_exclusions());
        assert!(!DomainType::Jul.supports_exclusions());

        let agents: Vec<_> = DomainType::ALL.into_iter().filter(|d| d.is_agent()).collect();
        assert_eq!(agents, vec![DomainType::Jul, DomainType::Log4j, DomainType::Python]);
    }

    #[test]
    fn test_parse_domain() {
        assert_eq!("UST".parse::<DomainType>().unwrap(), DomainType::Ust);
        assert_eq!("log4j".parse::<DomainType>().unwrap(), DomainType::Log4j);
        assert!("none".parse::<DomainType>().is_err());
    }
}
