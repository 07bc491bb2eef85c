use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use blob_indexer::{service, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    if cli.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).with_ansi(false).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = cli.into_config()?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting blob-indexer");

    if let Err(err) = service::run(config).await {
        error!(error = %err, "service exited with error");
        std::process::exit(1);
    }

    Ok(())
}
