//! ssb-core: the storage, indexing, and trust-graph core of a
//! Secure-Scuttlebutt peer (spec §4.8). Runs until interrupted; the
//! transport and replication layers this core feeds are out of scope here.

use tracing::{error, info};

use ssb_core::{Core, CoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ssb_core=info".parse()?),
        )
        .init();

    info!("ssb-core starting");

    let config = CoreConfig::load()?;
    let data_dir = config.data_dir();
    info!(data_dir = %data_dir.display(), "opening store");

    let core = Core::open(config)?;

    info!("core ready, indexes pumping");

    tokio::signal::ctrl_c().await?;
    info!("ctrl-c received, shutting down");

    if let Err(e) = core.shutdown() {
        error!(error = %e, "error during shutdown");
    }

    info!("ssb-core stopped");
    Ok(())
}
