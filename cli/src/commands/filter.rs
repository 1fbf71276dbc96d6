//! Filter command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracectl_filter_compiler::runas::current_credentials;
use tracectl_filter_compiler::{CompilerConfig, RunAsCompiler};
use tracectl_shared::bytecode::Credentials;
use tracectl_shared::event_rule::EventRule;
use tracectl_shared::utils::bytes_to_hex;

use super::encode::TracepointArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct FilterArgs {
    #[command(flatten)]
    pub rule: TracepointArgs,

    /// Compile the filter through the configured helper
    #[arg(long)]
    pub compile: bool,

    /// Compiler configuration file (TOML)
    #[arg(short, long, env = "TRACECTL_FILTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Compile as this user id (defaults to the invoking user)
    #[arg(long)]
    pub uid: Option<u32>,

    /// Compile as this group id (defaults to the invoking group)
    #[arg(long)]
    pub gid: Option<u32>,
}

pub fn run(args: FilterArgs) -> Result<()> {
    let tracepoint = args.rule.build()?;
    let source = if tracepoint.domain().is_agent() {
        tracepoint.generate_agent_filter()
    } else {
        tracepoint.filter_expression().map(str::to_string)
    };

    let Some(source) = source else {
        output::warning("Rule has no filter: every event matching the pattern is recorded");
        return Ok(());
    };
    output::field("filter", &source);

    if !args.compile {
        return Ok(());
    }

    let config = CompilerConfig::load(args.config.as_deref())
        .context("Failed to load filter compiler configuration")?;
    let compiler = RunAsCompiler::new(config);
    let current = current_credentials();
    let creds = Credentials::new(
        args.uid.unwrap_or(current.uid),
        args.gid.unwrap_or(current.gid),
    );

    let mut rule = EventRule::from(tracepoint);
    rule.generate_filter_bytecode(&creds, &compiler)
        .with_context(|| format!("Failed to compile filter '{}'", source))?;

    if let Some(bytecode) = rule.filter_bytecode() {
        output::field("bytecode", &bytes_to_hex(bytecode.as_bytes()));
        output::success(&format!("Compiled to {} bytes", bytecode.len()));
    }
    Ok(())
}

