//! Encode command implementation

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use tracectl_shared::event_rule::{EventRule, SyscallRule, TracepointRule};
use tracectl_shared::log_level_rule::LogLevelRule;
use tracectl_shared::protocol::Payload;
use tracectl_shared::types::domain::DomainType;
use tracectl_shared::types::loglevel::loglevel_from_name;
use tracectl_shared::utils::bytes_to_hex;

use crate::output;

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(subcommand)]
    pub rule: RuleArgs,
}

#[derive(Subcommand, Debug)]
pub enum RuleArgs {
    /// Tracepoint rule
    Tracepoint(TracepointArgs),

    /// System call rule (kernel domain)
    Syscall(SyscallArgs),
}

#[derive(Args, Debug)]
pub struct TracepointArgs {
    /// Tracing domain: kernel, ust, jul, log4j or python
    #[arg(short, long, default_value = "ust")]
    pub domain: DomainType,

    /// Event name pattern (defaults to every event)
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Filter expression
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Match this log level and more severe ones (name or value)
    #[arg(long, conflicts_with = "loglevel_only")]
    pub loglevel: Option<String>,

    /// Match exactly this log level (name or value)
    #[arg(long)]
    pub loglevel_only: Option<String>,

    /// Exclude an event name (UST only, repeatable)
    #[arg(short = 'x', long = "exclude")]
    pub exclusions: Vec<String>,
}

impl TracepointArgs {
    pub fn build(&self) -> Result<TracepointRule> {
        let mut rule = TracepointRule::new(self.domain);

        if let Some(pattern) = &self.pattern {
            rule.set_pattern(pattern)
                .with_context(|| format!("Invalid pattern '{}'", pattern))?;
        }
        if let Some(filter) = &self.filter {
            rule.set_filter(filter)
                .with_context(|| format!("Invalid filter expression '{}'", filter))?;
        }

        let log_level_rule = match (&self.loglevel, &self.loglevel_only) {
            (Some(name), _) => {
                let level = parse_level(self.domain, name)?;
                Some(LogLevelRule::AtLeastAsSevereAs(level))
            }
            (None, Some(name)) => Some(LogLevelRule::Exactly(parse_level(self.domain, name)?)),
            (None, None) => None,
        };
        if let Some(log_level_rule) = &log_level_rule {
            rule.set_log_level_rule(log_level_rule).with_context(|| {
                format!(
                    "Log level rule '{}' rejected for the {} domain",
                    log_level_rule, self.domain
                )
            })?;
        }

        for exclusion in &self.exclusions {
            rule.add_exclusion(exclusion).with_context(|| {
                format!("Exclusion '{}' rejected for the {} domain", exclusion, self.domain)
            })?;
        }

        Ok(rule)
    }
}

#[derive(Args, Debug)]
pub struct SyscallArgs {
    /// System call name pattern (defaults to every system call)
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Filter expression
    #[arg(short, long)]
    pub filter: Option<String>,
}

impl SyscallArgs {
    pub fn build(&self) -> Result<SyscallRule> {
        let mut rule = SyscallRule::new();
        if let Some(pattern) = &self.pattern {
            rule.set_pattern(pattern)
                .with_context(|| format!("Invalid pattern '{}'", pattern))?;
        }
        if let Some(filter) = &self.filter {
            rule.set_filter(filter)
                .with_context(|| format!("Invalid filter expression '{}'", filter))?;
        }
        Ok(rule)
    }
}

fn parse_level(domain: DomainType, name: &str) -> Result<i32> {
    loglevel_from_name(domain, name)
        .ok_or_else(|| anyhow!("Unknown {} log level '{}'", domain, name))
}

pub fn run(args: EncodeArgs) -> Result<()> {
    let rule: EventRule = match &args.rule {
        RuleArgs::Tracepoint(tracepoint) => tracepoint.build()?.into(),
        RuleArgs::Syscall(syscall) => syscall.build()?.into(),
    };

    let mut payload = Payload::new();
    rule.serialize(&mut payload)
        .context("Failed to serialize event rule")?;

    println!("{}", bytes_to_hex(payload.as_bytes()));
    output::success(&format!(
        "Encoded {} rule ({} bytes, hash {:016x})",
        rule.kind(),
        payload.len(),
        rule.hash()
    ));
    Ok(())
}
