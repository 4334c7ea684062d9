// Trigger scheduler
//
// One firing loop per watched project: compute the next cron instant,
// sleep until it, run the tick to completion, repeat. A project's ticks
// therefore never overlap, while different projects fire independently.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::schedule::TriggerSchedule;
use crate::trigger::DependencyUpdateTrigger;

/// A trigger paired with its firing schedule
pub struct ScheduledTrigger {
    pub schedule: TriggerSchedule,
    pub trigger: Arc<DependencyUpdateTrigger>,
}

pub struct TriggerScheduler {
    triggers: Vec<ScheduledTrigger>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TriggerScheduler {
    pub fn new(triggers: Vec<ScheduledTrigger>) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        Self {
            triggers,
            shutdown_tx,
        }
    }

    /// Handle for requesting shutdown from another task
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run all firing loops until shutdown is requested
    pub async fn run(self) {
        info!(triggers = self.triggers.len(), "starting trigger scheduler");

        let mut loops = JoinSet::new();
        for scheduled in self.triggers {
            let shutdown_rx = self.shutdown_tx.subscribe();
            loops.spawn(fire_loop(scheduled, shutdown_rx));
        }

        while loops.join_next().await.is_some() {}
        info!("trigger scheduler stopped");
    }
}

async fn fire_loop(scheduled: ScheduledTrigger, mut shutdown_rx: broadcast::Receiver<()>) {
    let project = scheduled.trigger.project_name().to_string();

    loop {
        let next = match scheduled.schedule.next_fire(Utc::now()) {
            Ok(next) => next,
            Err(e) => {
                warn!(project = %project, error = %e, "schedule yields no further fire times, stopping loop");
                return;
            }
        };

        let wait = (next - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(project = %project, fire_at = %next, "sleeping until next check");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_rx.recv() => {
                info!(project = %project, "shutdown requested, stopping trigger loop");
                return;
            }
        }

        // Tick runs to completion before the next fire time is considered;
        // shutdown is only honored between ticks.
        let outcome = scheduled.trigger.run().await;
        debug!(project = %project, outcome = ?outcome, "tick finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::default_timezone;

    #[test]
    fn test_scheduler_builds_with_no_triggers() {
        let scheduler = TriggerScheduler::new(vec![]);
        assert_eq!(scheduler.shutdown_handle().receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_loops() {
        // A daily schedule keeps the loop asleep; shutdown must still end it.
        let schedule = TriggerSchedule::parse("0 0 3 * * * *", default_timezone()).unwrap();
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            let scheduled = ScheduledTrigger {
                schedule,
                trigger: Arc::new(crate::trigger::tests_support::quiet_trigger()),
            };
            fire_loop(scheduled, rx).await;
        });

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop did not stop on shutdown")
            .unwrap();
    }
}
