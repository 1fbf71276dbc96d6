//! Decode command implementation

use anyhow::{Context, Result};
use clap::Args;
use tracectl_shared::event_rule::EventRule;
use tracectl_shared::protocol::PayloadView;
use tracectl_shared::types::loglevel::loglevel_name;

use crate::output;

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Payload as hex, as printed by `tracectl encode`
    pub payload: String,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

/// Payload bytes from hex text; whitespace between digits is ignored.
fn parse_payload(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(digits).context("Payload is not valid hex")
}

pub fn run(args: DecodeArgs) -> Result<()> {
    let bytes = parse_payload(&args.payload)?;

    let (rule, consumed) = EventRule::create_from_payload(PayloadView::new(&bytes))
        .context("Failed to decode event rule")?;

    let json = if args.compact {
        serde_json::to_string(&rule)?
    } else {
        serde_json::to_string_pretty(&rule)?
    };
    println!("{}", json);

    if let Some(level) = rule
        .as_tracepoint()
        .and_then(|tracepoint| tracepoint.log_level_rule())
    {
        let name = loglevel_name(rule.domain_type(), level.level()).unwrap_or("custom level");
        output::info(&format!("Log level rule: {} ({})", level, name));
    }

    output::info(&format!(
        "Decoded {} rule from {} of {} bytes",
        rule.kind(),
        consumed,
        bytes.len()
    ));
    if consumed < bytes.len() {
        output::warning(&format!("{} trailing bytes ignored", bytes.len() - consumed));
    }
    Ok(())
}
