// Archflow - human-in-the-loop architecture analysis agent
// Main entry point

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use archflow::agent::SessionDriver;
use archflow::cli::run_interactive;
use archflow::config::load_config;
use archflow::providers::ClaudeProvider;

#[derive(Parser, Debug)]
#[command(name = "archflow", version, about = "Refine a system description into a reviewed architecture spec and diagram")]
struct Args {
    /// Initial system description; prompted interactively when omitted
    description: Option<String>,

    /// Override the configured model
    #[arg(long)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing (RUST_LOG takes precedence)
    let default_filter = if args.verbose {
        "archflow=debug"
    } else {
        "archflow=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = load_config()?;

    // Create the generation provider
    let provider = ClaudeProvider::with_base_url(config.api_key.clone(), config.base_url.clone())?
        .with_model(args.model.unwrap_or(config.model))
        .with_max_tokens(config.max_tokens);

    // Run the interactive session
    let driver = SessionDriver::new(Arc::new(provider));
    run_interactive(driver, args.description).await
}
