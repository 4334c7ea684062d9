// Build request publisher
//
// The build executor is a separate system; the trigger only hands it a
// fire-and-forget request message carrying the cause.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::QueueError;
use crate::models::UpdateCause;

/// Message format for a requested build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Unique request ID
    pub id: Uuid,
    /// Project to rebuild
    pub project: String,
    /// Seconds the executor may wait to coalesce further triggers
    pub quiet_period_seconds: u64,
    /// Why this build was requested
    pub cause: UpdateCause,
    /// Timestamp when the request was published
    pub enqueued_at: DateTime<Utc>,
}

impl BuildRequest {
    pub fn new(project: &str, quiet_period: Duration, cause: UpdateCause) -> Self {
        Self {
            id: Uuid::new_v4(),
            project: project.to_string(),
            quiet_period_seconds: quiet_period.as_secs(),
            cause,
            enqueued_at: Utc::now(),
        }
    }
}

/// BuildQueue trait for requesting project builds
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BuildQueue: Send + Sync {
    /// Request a build of `project` after `quiet_period`, annotated with
    /// `cause`. Fire-and-forget: a returned `Ok` means the request was
    /// handed to the queue, not that a build ran.
    async fn enqueue(
        &self,
        project: &str,
        quiet_period: Duration,
        cause: UpdateCause,
    ) -> Result<(), QueueError>;
}

/// NATS-based build queue publisher
pub struct NatsBuildQueue {
    client: async_nats::Client,
    subject_prefix: String,
    publish_timeout: Duration,
}

impl NatsBuildQueue {
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            client,
            subject_prefix: "builds.request".to_string(),
            publish_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    fn subject_for(&self, project: &str) -> String {
        format!("{}.{}", self.subject_prefix, project)
    }
}

#[async_trait::async_trait]
impl BuildQueue for NatsBuildQueue {
    #[instrument(skip(self, cause), fields(project = project, artifacts = cause.updated_artifacts.len()))]
    async fn enqueue(
        &self,
        project: &str,
        quiet_period: Duration,
        cause: UpdateCause,
    ) -> Result<(), QueueError> {
        let request = BuildRequest::new(project, quiet_period, cause);
        let payload = serde_json::to_vec(&request)?;
        let subject = self.subject_for(project);

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| QueueError::PublishFailed(e.to_string()))?;

        // Flush so a fire-and-forget request is not lost in a client buffer
        tokio::time::timeout(self.publish_timeout, self.client.flush())
            .await
            .map_err(|_| {
                QueueError::Timeout(format!(
                    "flush did not complete within {:?}",
                    self.publish_timeout
                ))
            })?
            .map_err(|e| QueueError::PublishFailed(e.to_string()))?;

        info!(request_id = %request.id, subject = %subject, "build request published");
        Ok(())
    }
}
