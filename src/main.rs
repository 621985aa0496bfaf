//! tabular-insight - Main Entry Point

use clap::Parser;
use tabular_insight::cli::{self, Cli};
use tabular_insight::config::RuntimeConfig;
use tabular_insight::utils::init_runtime;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabular_insight=info".into()),
        )
        .init();

    init_runtime(RuntimeConfig::default())?;

    cli::run(Cli::parse())
}
