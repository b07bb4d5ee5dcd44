//! mdpane CLI - Markdown preview renderer.
//!
//! Provides commands for:
//! - `render`: Render a markdown file to a styled HTML fragment

mod commands;
mod config;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::RenderArgs;
use output::Output;

/// mdpane - Markdown preview renderer.
#[derive(Parser)]
#[command(name = "mdpane", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to a styled HTML fragment.
    Render(RenderArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // Check if verbose flag is set for render command
    let verbose = matches!(&cli.command, Commands::Render(args) if args.verbose);

    // Initialize tracing with appropriate log level
    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
