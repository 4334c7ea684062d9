// Dependency update trigger
//
// One instance per watched project. Each scheduled tick is independent:
// check the last-build node for newer SNAPSHOT dependencies and, when some
// were fetched, request one rebuild with the artifact names as its cause.
// No retry counters, no backoff, no state across ticks.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::dispatch::ExecutionDispatcher;
use crate::errors::{DispatchError, QueueError};
use crate::models::{ProjectHandle, UpdateCause};
use crate::queue::BuildQueue;

/// Terminal state of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to check: the project has never been built
    SkippedNoBuild,
    /// The check failed; treated as "no update this tick"
    SkippedError,
    /// Everything up to date
    NoUpdate,
    /// Newer dependencies were fetched and a build was enqueued
    Triggered { artifacts: Vec<String> },
}

#[derive(Error, Debug)]
enum TickError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct DependencyUpdateTrigger {
    project: Arc<dyn ProjectHandle>,
    check_plugin_deps: bool,
    dispatcher: Arc<ExecutionDispatcher>,
    queue: Arc<dyn BuildQueue>,
}

impl DependencyUpdateTrigger {
    pub fn new(
        project: Arc<dyn ProjectHandle>,
        check_plugin_deps: bool,
        dispatcher: Arc<ExecutionDispatcher>,
        queue: Arc<dyn BuildQueue>,
    ) -> Self {
        Self {
            project,
            check_plugin_deps,
            dispatcher,
            queue,
        }
    }

    pub fn project_name(&self) -> &str {
        self.project.name()
    }

    /// Run one scheduled tick. Never fails: every error is logged here and
    /// degraded, so a broken check can never take the scheduler down with
    /// it.
    #[instrument(skip(self), fields(project = %self.project.name()))]
    pub async fn run(&self) -> TickOutcome {
        match self.tick().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "dependency check failed, treating as no update");
                TickOutcome::SkippedError
            }
        }
    }

    async fn tick(&self) -> Result<TickOutcome, TickError> {
        if self.project.last_build().is_none() {
            info!("no previous build found, skipping dependency check");
            return Ok(TickOutcome::SkippedNoBuild);
        }

        let Some(result) = self
            .dispatcher
            .dispatch(self.project.as_ref(), self.check_plugin_deps)
            .await?
        else {
            return Ok(TickOutcome::SkippedNoBuild);
        };

        if !result.has_updates() {
            info!("all SNAPSHOT dependencies up to date");
            return Ok(TickOutcome::NoUpdate);
        }

        info!(
            artifacts = ?result.updated,
            "newer SNAPSHOT dependencies fetched, requesting build"
        );
        self.queue
            .enqueue(
                self.project.name(),
                Duration::ZERO,
                UpdateCause::new(result.updated.clone()),
            )
            .await?;

        Ok(TickOutcome::Triggered {
            artifacts: result.updated,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use crate::dispatch::NodeRegistry;
    use crate::models::FreestyleProject;
    use std::path::PathBuf;

    struct NullQueue;

    #[async_trait::async_trait]
    impl BuildQueue for NullQueue {
        async fn enqueue(
            &self,
            _project: &str,
            _quiet_period: Duration,
            _cause: UpdateCause,
        ) -> Result<(), QueueError> {
            Ok(())
        }
    }

    /// A trigger whose ticks always skip: never-built project, empty node
    /// registry.
    pub(crate) fn quiet_trigger() -> DependencyUpdateTrigger {
        let project = Arc::new(FreestyleProject {
            name: "idle".to_string(),
            assigned_node: None,
            workspace: None,
            module_root: PathBuf::new(),
            steps: vec![],
            last_build: None,
        });
        let dispatcher = Arc::new(ExecutionDispatcher::new(
            Arc::new(NodeRegistry::new()),
            PathBuf::from("/var/cache/deps"),
            Duration::from_secs(5),
        ));
        DependencyUpdateTrigger::new(project, false, dispatcher, Arc::new(NullQueue))
    }
}
