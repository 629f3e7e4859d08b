use anyhow::Result;
use clap::Parser;
use stockbook::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.run().await
}

/// Log to stderr so command output on stdout stays machine readable.
/// RUST_LOG overrides the default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "stockbook=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
