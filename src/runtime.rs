//! Access to the ambient Tokio runtime.
//!
//! Hooks can be driven from outside a runtime (a synchronous host callback, a
//! test without `#[tokio::test]`). Background work is then skipped with a warning
//! instead of panicking in `tokio::spawn`.

use tokio::runtime::Handle;
use tracing::warn;

/// Handle of the current runtime, or `None` (logged) when there is none.
pub(crate) fn current(task: &'static str) -> Option<Handle> {
    match Handle::try_current() {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(task, %err, "no runtime; background task not started");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_runtime_is_none() {
        assert!(current("test").is_none());
    }

    #[tokio::test]
    async fn test_inside_runtime() {
        assert!(current("test").is_some());
    }
}
