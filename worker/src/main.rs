// Worker binary entry point: serves dependency check commands for one
// agent node.

use anyhow::Context;
use common::checker::{HelperProcessChecker, UpdateChecker};
use common::config::Settings;
use common::telemetry;
use common::worker::CheckService;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    let worker = settings
        .worker
        .as_ref()
        .context("missing [worker] configuration")?;

    telemetry::init_logging(&settings.observability.log_level)?;
    info!(node = %worker.node_name, "starting dependency check worker");

    let client = async_nats::connect(settings.nats.url.as_str())
        .await
        .context("failed to connect to NATS")?;
    info!(url = %settings.nats.url, "connected to NATS");

    let checker: Arc<dyn UpdateChecker> = Arc::new(HelperProcessChecker::new());
    let service = CheckService::new(client, worker.node_name.clone(), checker);
    let shutdown = service.shutdown_handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        info!("received shutdown signal");
        let _ = shutdown.send(());
    });

    service.run().await?;
    info!("worker stopped");
    Ok(())
}
