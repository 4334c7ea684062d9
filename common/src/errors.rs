// Error handling framework

use thiserror::Error;

/// Schedule-related errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("No next fire time available for expression '{0}'")]
    NoNextFire(String),
}

/// Capability-probe errors
///
/// Never escape the probe: the caller logs the message and falls back to
/// the shared cache.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Capability query failed: {0}")]
    CapabilityFailed(String),
}

/// Command-channel transport errors
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Command serialization failed: {0}")]
    Serialization(String),

    #[error("Reply deserialization failed: {0}")]
    Deserialization(String),

    #[error("Remote check failed: {0}")]
    RemoteFailed(String),

    #[error("No reply within {0} seconds")]
    Timeout(u64),
}

/// Errors from the dependency check itself, on the executing node
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Build descriptor unreadable: {0}")]
    UnreadableDescriptor(String),

    #[error("Failed to launch helper '{helper}': {reason}")]
    HelperLaunchFailed { helper: String, reason: String },

    #[error("Helper exited with status {status}: {stderr}")]
    HelperFailed { status: i32, stderr: String },

    #[error("Malformed helper report: {0}")]
    MalformedReport(String),
}

/// Dispatch errors: everything that can go wrong between "tick fired" and
/// "result returned from the target node"
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Last-build node '{0}' is not registered")]
    UnknownNode(String),

    #[error("Project '{0}' has no workspace on its last-build node")]
    MissingWorkspace(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Build-queue errors
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to connect to queue: {0}")]
    Connection(String),

    #[error("Failed to publish build request: {0}")]
    PublishFailed(String),

    #[error("Build request serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Queue operation timeout: {0}")]
    Timeout(String),
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        ChannelError::Deserialization(err.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::SerializationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_error_display() {
        let err = ScheduleError::InvalidCronExpression {
            expression: "* * * *".to_string(),
            reason: "invalid format".to_string(),
        };
        assert!(err.to_string().contains("Invalid cron expression"));
        assert!(err.to_string().contains("* * * *"));
    }

    #[test]
    fn test_channel_error_timeout_display() {
        let err = ChannelError::Timeout(300);
        assert!(err.to_string().contains("300 seconds"));
    }

    #[test]
    fn test_dispatch_error_wraps_channel_error() {
        let err = DispatchError::from(ChannelError::Transport("connection reset".to_string()));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_check_error_helper_failed_display() {
        let err = CheckError::HelperFailed {
            status: 2,
            stderr: "repository unreachable".to_string(),
        };
        assert!(err.to_string().contains("status 2"));
    }
}
