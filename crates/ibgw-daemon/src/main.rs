//! Gateway pool daemon entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Multi-tenant brokerage gateway pool daemon
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via IBGW_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    ibgw_telemetry::init_logging()?;

    info!("Starting ibgw-daemon v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.config.or_else(|| std::env::var("IBGW_CONFIG").ok()) {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            ibgw_daemon::AppConfig::from_file(&path)?
        }
        None => ibgw_daemon::AppConfig::load()?,
    };

    let app = ibgw_daemon::Application::new(config);
    app.run().await?;

    Ok(())
}
