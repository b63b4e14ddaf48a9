use anyhow::Result;
use clap::Parser;
use ie_taskmodules::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ie_taskmodules=info")),
        )
        .init();

    Cli::parse().run()
}
