// Execution context for in-process checks
//
// When the controller dispatches a check to itself, the helper lives under
// the controller's plugin area rather than an agent install root. The
// dispatcher passes that root as an explicit context and installs it in a
// process-wide ambient slot only for the duration of the call: saved on
// entry, restored on drop, including when the dispatch fails.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Code-resolution context for a check executing in this process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Directory the helper executable is resolved under
    pub helper_root: PathBuf,
}

static AMBIENT: Mutex<Option<ExecutionContext>> = Mutex::new(None);

/// Currently installed ambient context, if any
pub fn current() -> Option<ExecutionContext> {
    AMBIENT
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Enter a scope. `Some` installs the context, `None` leaves the slot
/// untouched; either way the guard restores the previous value on drop.
#[must_use = "the previous context is restored when the guard drops"]
pub fn scope(context: Option<ExecutionContext>) -> AmbientGuard {
    let mut slot = AMBIENT.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = slot.clone();
    if let Some(context) = context {
        *slot = Some(context);
    }
    AmbientGuard { previous }
}

pub struct AmbientGuard {
    previous: Option<ExecutionContext>,
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        *AMBIENT.lock().unwrap_or_else(PoisonError::into_inner) = self.previous.take();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(root: &str) -> ExecutionContext {
        ExecutionContext {
            helper_root: PathBuf::from(root),
        }
    }

    #[test]
    fn test_scope_installs_and_restores() {
        let _serial = test_support::serialize();
        let before = current();
        {
            let _guard = scope(Some(ctx("/opt/controller/plugins")));
            assert_eq!(current(), Some(ctx("/opt/controller/plugins")));
        }
        assert_eq!(current(), before);
    }

    #[test]
    fn test_empty_scope_leaves_slot_untouched() {
        let _serial = test_support::serialize();
        let outer = scope(Some(ctx("/outer")));
        {
            let _inner = scope(None);
            assert_eq!(current(), Some(ctx("/outer")));
        }
        assert_eq!(current(), Some(ctx("/outer")));
        drop(outer);
    }

    #[test]
    fn test_restore_runs_on_unwind() {
        let _serial = test_support::serialize();
        let before = current();
        let result = std::panic::catch_unwind(|| {
            let _guard = scope(Some(ctx("/unwound")));
            panic!("dispatch blew up");
        });
        assert!(result.is_err());
        assert_eq!(current(), before);
    }
}
