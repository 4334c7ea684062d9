// Scheduler binary entry point: the controller side of the dependency
// update trigger. Wires configuration into a node registry, one trigger
// per watched project, and runs the firing loops.

use anyhow::Context;
use common::checker::{HelperProcessChecker, UpdateChecker};
use common::config::Settings;
use common::dispatch::{
    CommandChannel, ExecutionDispatcher, LocalChannel, NatsChannel, NodeRegistry,
};
use common::models::Node;
use common::queue::{BuildQueue, NatsBuildQueue};
use common::schedule::{self, TriggerSchedule};
use common::scheduler::{ScheduledTrigger, TriggerScheduler};
use common::telemetry;
use common::trigger::DependencyUpdateTrigger;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    telemetry::init_logging(&settings.observability.log_level)?;
    info!("starting dependency update scheduler");

    let client = async_nats::connect(settings.nats.url.as_str())
        .await
        .context("failed to connect to NATS")?;
    info!(url = %settings.nats.url, "connected to NATS");

    // One in-process checker serves every self-dispatch; remote nodes run
    // their own through the worker binary.
    let checker: Arc<dyn UpdateChecker> = Arc::new(HelperProcessChecker::new());

    let mut registry = NodeRegistry::new();
    for node_config in &settings.nodes {
        let node = Node {
            name: node_config.name.clone(),
            root_path: node_config.root_path.clone(),
            kind: node_config.kind,
        };
        let channel: Arc<dyn CommandChannel> = if node.is_controller() {
            Arc::new(LocalChannel::new(checker.clone()))
        } else {
            Arc::new(NatsChannel::new(client.clone(), &node.name))
        };
        info!(node = %node.name, kind = ?node.kind, "registered node");
        registry.register(node, channel);
    }
    info!(nodes = registry.len(), "node registry ready");

    let dispatcher = Arc::new(ExecutionDispatcher::new(
        Arc::new(registry),
        settings.cache.shared_dir.clone(),
        Duration::from_secs(settings.dispatch.timeout_seconds),
    ));
    let queue: Arc<dyn BuildQueue> = Arc::new(NatsBuildQueue::new(client.clone()));

    let mut triggers = Vec::new();
    for project_config in &settings.projects {
        let timezone = match &project_config.timezone {
            Some(name) => schedule::parse_timezone(name)
                .map_err(|e| anyhow::anyhow!("project '{}': {e}", project_config.name))?,
            None => schedule::default_timezone(),
        };
        let trigger_schedule = TriggerSchedule::parse(&project_config.cron, timezone)
            .map_err(|e| anyhow::anyhow!("project '{}': {e}", project_config.name))?;
        if let Some(warning) = trigger_schedule.check_sanity() {
            warn!(project = %project_config.name, warning = %warning, "schedule sanity warning");
        }

        let project = Arc::new(project_config.to_project());
        let trigger = Arc::new(DependencyUpdateTrigger::new(
            project,
            project_config.check_plugin_deps,
            dispatcher.clone(),
            queue.clone(),
        ));
        info!(
            project = %project_config.name,
            cron = %project_config.cron,
            "watching project"
        );
        triggers.push(ScheduledTrigger {
            schedule: trigger_schedule,
            trigger,
        });
    }

    let scheduler = TriggerScheduler::new(triggers);
    let shutdown = scheduler.shutdown_handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        info!("received shutdown signal");
        let _ = shutdown.send(());
    });

    scheduler.run().await;
    info!("scheduler stopped");
    Ok(())
}
