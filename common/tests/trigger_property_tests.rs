// Property-based tests for the trigger decision layer

use async_trait::async_trait;
use chrono::Utc;
use common::command::{DependencyCheckCommand, UpdateResult};
use common::dispatch::{CommandChannel, ExecutionDispatcher, NodeRegistry};
use common::errors::{ChannelError, QueueError};
use common::models::{BuildRecord, FreestyleProject, Node, NodeKind, UpdateCause};
use common::queue::BuildQueue;
use common::trigger::{DependencyUpdateTrigger, TickOutcome};
use proptest::prelude::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingQueue {
    requests: Mutex<Vec<(String, Duration, UpdateCause)>>,
}

#[async_trait]
impl BuildQueue for RecordingQueue {
    async fn enqueue(
        &self,
        project: &str,
        quiet_period: Duration,
        cause: UpdateCause,
    ) -> Result<(), QueueError> {
        self.requests
            .lock()
            .unwrap()
            .push((project.to_string(), quiet_period, cause));
        Ok(())
    }
}

struct StaticChannel {
    updated: Vec<String>,
}

#[async_trait]
impl CommandChannel for StaticChannel {
    async fn call(&self, _command: DependencyCheckCommand) -> Result<UpdateResult, ChannelError> {
        Ok(UpdateResult {
            updated: self.updated.clone(),
        })
    }
}

fn trigger_over(updated: Vec<String>, queue: Arc<RecordingQueue>) -> DependencyUpdateTrigger {
    let mut registry = NodeRegistry::new();
    registry.register(
        Node {
            name: "worker-1".to_string(),
            root_path: PathBuf::from("/opt/agent"),
            kind: NodeKind::Agent,
        },
        Arc::new(StaticChannel { updated }),
    );
    let dispatcher = Arc::new(ExecutionDispatcher::new(
        Arc::new(registry),
        PathBuf::from("/var/cache/deps"),
        Duration::from_secs(5),
    ));
    let project = Arc::new(FreestyleProject {
        name: "app".to_string(),
        assigned_node: None,
        workspace: Some(PathBuf::from("/var/build/app")),
        module_root: PathBuf::new(),
        steps: vec![],
        last_build: Some(BuildRecord {
            number: 1,
            built_on: "worker-1".to_string(),
            finished_at: Utc::now(),
        }),
    });
    DependencyUpdateTrigger::new(project, false, dispatcher, queue)
}

fn artifact_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,10}-[0-9]\\.[0-9]-SNAPSHOT\\.jar"
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        .. ProptestConfig::default()
    })]

    /// *For any* non-empty set of fetched artifacts, one tick requests
    /// exactly one build whose cause lists those artifacts in order.
    #[test]
    fn property_updates_enqueue_exactly_one_build(
        artifacts in proptest::collection::vec(artifact_name(), 1..8)
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let queue = Arc::new(RecordingQueue::default());
            let trigger = trigger_over(artifacts.clone(), queue.clone());

            let outcome = trigger.run().await;
            prop_assert_eq!(outcome, TickOutcome::Triggered { artifacts: artifacts.clone() });

            let requests = queue.requests.lock().unwrap();
            prop_assert_eq!(requests.len(), 1);
            let (project, quiet_period, cause) = &requests[0];
            prop_assert_eq!(project.as_str(), "app");
            prop_assert_eq!(*quiet_period, Duration::ZERO);
            prop_assert_eq!(&cause.updated_artifacts, &artifacts);
            Ok(())
        })?;
    }

    /// *For any* number of quiet ticks, no build is ever requested.
    #[test]
    fn property_quiet_ticks_never_enqueue(ticks in 1usize..5) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let queue = Arc::new(RecordingQueue::default());
            let trigger = trigger_over(vec![], queue.clone());

            for _ in 0..ticks {
                prop_assert_eq!(trigger.run().await, TickOutcome::NoUpdate);
            }
            prop_assert!(queue.requests.lock().unwrap().is_empty());
            Ok(())
        })?;
    }
}
