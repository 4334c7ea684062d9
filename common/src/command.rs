// Wire types for the remote dependency check
//
// A check command crosses a machine boundary: every field is a plain value
// resolved on the controller side, and nothing in it refers back to
// controller memory. Replies come back over the same channel.

use serde::{Deserialize, Serialize};

/// Self-contained description of one dependency freshness check.
///
/// Constructed fresh per tick, never mutated, discarded after the call
/// returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCheckCommand {
    /// Helper executable, as seen from the target node's filesystem
    pub helper_path: String,
    /// Absolute path of the project's build descriptor on the target node
    pub build_descriptor: String,
    /// Dependency cache the check resolves into
    pub cache_dir: String,
    /// Also check plugin-type dependencies
    pub check_plugin_deps: bool,
    /// Project workspace on the target node
    pub workspace: String,
    /// Whether the target node is the controller itself
    pub on_controller: bool,
}

/// Result of a dependency check: the artifact file names that were found
/// newer and fetched. Empty means everything was up to date.
///
/// This set is the sole signal the decision layer consults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub updated: Vec<String>,
}

impl UpdateResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_updates(&self) -> bool {
        !self.updated.is_empty()
    }
}

/// Reply envelope sent back over the channel by the executing node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckReply {
    Ok { result: UpdateResult },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_round_trips_as_plain_values() {
        let command = DependencyCheckCommand {
            helper_path: "/opt/agent/snapshot-check-helper".to_string(),
            build_descriptor: "/var/build/app/pom.xml".to_string(),
            cache_dir: "/var/cache/deps".to_string(),
            check_plugin_deps: true,
            workspace: "/var/build/app".to_string(),
            on_controller: false,
        };
        let json = serde_json::to_vec(&command).unwrap();
        let back: DependencyCheckCommand = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, command);
    }

    #[test]
    fn test_reply_tagged_encoding() {
        let reply = CheckReply::Ok {
            result: UpdateResult {
                updated: vec!["lib-core-1.1-SNAPSHOT.jar".to_string()],
            },
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"status\":\"ok\""));

        let err: CheckReply =
            serde_json::from_str(r#"{"status":"error","message":"descriptor unreadable"}"#)
                .unwrap();
        match err {
            CheckReply::Error { message } => assert!(message.contains("unreadable")),
            CheckReply::Ok { .. } => panic!("expected error reply"),
        }
    }

    #[test]
    fn test_empty_result_has_no_updates() {
        assert!(!UpdateResult::empty().has_updates());
        assert!(UpdateResult {
            updated: vec!["a.jar".to_string()]
        }
        .has_updates());
    }
}
