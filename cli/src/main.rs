//! CLI for tracectl
//!
//! Works with event rules outside of the session daemon:
//! - encode: Build a rule and print its payload as hex
//! - decode: Decode a hex payload and print the rule as JSON
//! - filter: Show (and optionally compile) the filter a rule would install

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "tracectl")]
#[command(about = "tracectl - event rule toolbox", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an event rule into its payload
    Encode(commands::encode::EncodeArgs),

    /// Decode an event rule payload
    Decode(commands::decode::DecodeArgs),

    /// Show the filter generated for a tracepoint rule
    Filter(commands::filter::FilterArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Encode(args) => commands::encode::run(args),
        Commands::Decode(args) => commands::decode::run(args),
        Commands::Filter(args) => commands::filter::run(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
