//! System Preparation Hooks
//!
//! Best-effort calls made before and after a run (keep the screen awake, set a
//! sustained-performance mode, ...). Hook failures are logged and never affect
//! the run's outcome.

use crate::kernel::panic_message;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

/// Opaque failure reported by a hook
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Platform preparation and cleanup around a benchmark run
pub trait SystemHooks: Send + Sync {
    /// Called once before the sampler and kernel start
    fn prepare(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once after the kernel returned and the sampler stopped
    fn cleanup(&self) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl SystemHooks for NoopHooks {}

/// Run one hook, swallowing both errors and panics
pub(crate) fn run_best_effort(stage: &'static str, hook: impl FnOnce() -> Result<(), HookError>) {
    match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => debug!(stage, "system hook completed"),
        Ok(Err(e)) => warn!(stage, error = %e, "system hook failed; continuing"),
        Err(panic) => warn!(
            stage,
            panic = %panic_message(panic.as_ref()),
            "system hook panicked; continuing"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_noop_hooks_succeed() {
        assert!(NoopHooks.prepare().is_ok());
        assert!(NoopHooks.cleanup().is_ok());
    }

    #[test]
    fn test_errors_are_swallowed() {
        run_best_effort("prepare", || Err("game mode unavailable".into()));
    }

    #[test]
    fn test_panics_are_swallowed() {
        let ran = AtomicBool::new(false);
        run_best_effort("cleanup", || {
            ran.store(true, Ordering::SeqCst);
            panic!("window already closed")
        });
        assert!(ran.load(Ordering::SeqCst));
    }
}
