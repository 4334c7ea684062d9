// Command channels
//
// A channel carries one check command to its node and one reply back.
// Only plain values cross: the command serializes to JSON on the way out
// and the reply deserializes on the way back, so no object identity or
// live reference survives the boundary.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::checker::UpdateChecker;
use crate::command::{CheckReply, DependencyCheckCommand, UpdateResult};
use crate::errors::ChannelError;

/// One-shot command transport to an execution target
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn call(&self, command: DependencyCheckCommand) -> Result<UpdateResult, ChannelError>;
}

/// In-process channel for the controller-is-target case. The command still
/// goes through its wire form so local and remote execution stay
/// indistinguishable to the checker.
pub struct LocalChannel {
    checker: Arc<dyn UpdateChecker>,
}

impl LocalChannel {
    pub fn new(checker: Arc<dyn UpdateChecker>) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl CommandChannel for LocalChannel {
    async fn call(&self, command: DependencyCheckCommand) -> Result<UpdateResult, ChannelError> {
        let payload =
            serde_json::to_vec(&command).map_err(|e| ChannelError::Serialization(e.to_string()))?;
        let command: DependencyCheckCommand = serde_json::from_slice(&payload)?;

        self.checker
            .check(&command)
            .await
            .map_err(|e| ChannelError::RemoteFailed(e.to_string()))
    }
}

/// Request/reply channel to a remote agent's check service
pub struct NatsChannel {
    client: async_nats::Client,
    subject: String,
}

impl NatsChannel {
    pub fn new(client: async_nats::Client, node_name: &str) -> Self {
        Self {
            client,
            subject: check_subject(node_name),
        }
    }
}

/// Subject an agent's check service listens on
pub fn check_subject(node_name: &str) -> String {
    format!("deps.check.{node_name}")
}

#[async_trait]
impl CommandChannel for NatsChannel {
    async fn call(&self, command: DependencyCheckCommand) -> Result<UpdateResult, ChannelError> {
        let payload =
            serde_json::to_vec(&command).map_err(|e| ChannelError::Serialization(e.to_string()))?;

        debug!(subject = %self.subject, "sending check command");
        let reply = self
            .client
            .request(self.subject.clone(), payload.into())
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        match serde_json::from_slice::<CheckReply>(&reply.payload)? {
            CheckReply::Ok { result } => Ok(result),
            CheckReply::Error { message } => Err(ChannelError::RemoteFailed(message)),
        }
    }
}
