// Dependency check execution on the target node
//
// The checker is handed a self-contained command and must work from its
// plain values alone; the controller that built the command may live in a
// different process on a different machine. "Nothing newer" is a success
// with an empty result, never an error.

pub mod helper;

use async_trait::async_trait;

use crate::command::{DependencyCheckCommand, UpdateResult};
use crate::errors::CheckError;

pub use helper::HelperProcessChecker;

/// Executes a dependency freshness check described by a command.
///
/// Fails only for unrecoverable conditions (unreadable build descriptor,
/// unreachable repository, broken helper); the dispatcher degrades those to
/// "no update this tick".
#[async_trait]
pub trait UpdateChecker: Send + Sync {
    async fn check(&self, command: &DependencyCheckCommand) -> Result<UpdateResult, CheckError>;
}
