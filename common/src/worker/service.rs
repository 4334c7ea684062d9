// Check service
//
// The agent-side half of the dispatch channel: listens on the node's check
// subject, runs each received command through the configured checker and
// replies with the outcome. One bad request is answered with an error
// reply; it never ends the service loop.

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use crate::checker::UpdateChecker;
use crate::command::{CheckReply, DependencyCheckCommand};
use crate::dispatch::check_subject;
use crate::errors::ChannelError;

pub struct CheckService {
    client: async_nats::Client,
    node_name: String,
    checker: Arc<dyn UpdateChecker>,
    shutdown_tx: broadcast::Sender<()>,
}

impl CheckService {
    pub fn new(
        client: async_nats::Client,
        node_name: String,
        checker: Arc<dyn UpdateChecker>,
    ) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        Self {
            client,
            node_name,
            checker,
            shutdown_tx,
        }
    }

    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Serve check requests until shutdown is requested
    #[instrument(skip(self), fields(node = %self.node_name))]
    pub async fn run(&self) -> Result<(), ChannelError> {
        let subject = check_subject(&self.node_name);
        let mut subscription = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!(subject = %subject, "check service listening");

        loop {
            tokio::select! {
                message = subscription.next() => {
                    let Some(message) = message else {
                        warn!("check subscription closed by server");
                        return Ok(());
                    };

                    let reply = respond_to(&message.payload, self.checker.as_ref()).await;
                    let Some(reply_subject) = message.reply else {
                        warn!("check request carried no reply subject, dropping result");
                        continue;
                    };

                    match serde_json::to_vec(&reply) {
                        Ok(payload) => {
                            if let Err(e) = self.client.publish(reply_subject, payload.into()).await {
                                error!(error = %e, "failed to publish check reply");
                            }
                        }
                        Err(e) => error!(error = %e, "failed to serialize check reply"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown requested, stopping check service");
                    return Ok(());
                }
            }
        }
    }
}

/// Decode one request payload and run the check. Every failure mode turns
/// into an error reply for the controller to degrade.
async fn respond_to(payload: &[u8], checker: &dyn UpdateChecker) -> CheckReply {
    let command: DependencyCheckCommand = match serde_json::from_slice(payload) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "received malformed check command");
            return CheckReply::Error {
                message: format!("malformed check command: {e}"),
            };
        }
    };

    match checker.check(&command).await {
        Ok(result) => {
            info!(updated = result.updated.len(), "dependency check completed");
            CheckReply::Ok { result }
        }
        Err(e) => {
            warn!(error = %e, "dependency check failed");
            CheckReply::Error {
                message: e.to_string(),
            }
        }
    }
}
