//! Native Compute Bridge
//!
//! One-shot, blocking invocation of the opaque compute kernel. The kernel runs
//! to completion or fails; it cannot be interrupted, reports no progress and
//! produces a single text payload.
//!
//! Panics raised inside a kernel are caught here and reported as
//! [`KernelError::Panicked`], so a misbehaving kernel cannot take the
//! orchestrator's worker thread down with it.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by a kernel call
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("kernel failed: {0}")]
    Failed(String),

    #[error("kernel panicked: {0}")]
    Panicked(String),

    #[error("kernel timed out after {0:?}")]
    TimedOut(Duration),

    #[error("kernel could not be launched: {0}")]
    Launch(#[from] std::io::Error),
}

/// An opaque, blocking compute kernel returning one raw result payload
pub trait ComputeKernel: Send + Sync {
    /// Run the full benchmark suite. Blocks until the kernel finishes.
    fn invoke(&self) -> Result<String, KernelError>;
}

impl<F> ComputeKernel for F
where
    F: Fn() -> Result<String, KernelError> + Send + Sync,
{
    fn invoke(&self) -> Result<String, KernelError> {
        self()
    }
}

/// Boundary around a [`ComputeKernel`] that converts panics into errors
#[derive(Clone)]
pub struct NativeComputeBridge {
    kernel: Arc<dyn ComputeKernel>,
}

impl NativeComputeBridge {
    /// Wrap a kernel
    pub fn new(kernel: Arc<dyn ComputeKernel>) -> Self {
        Self { kernel }
    }

    /// Invoke the kernel once and wait for its payload.
    pub fn invoke(&self) -> Result<String, KernelError> {
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.kernel.invoke()));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(payload)) => {
                debug!(elapsed_ms, bytes = payload.len(), "kernel returned payload");
                Ok(payload)
            }
            Ok(Err(e)) => {
                warn!(elapsed_ms, error = %e, "kernel call failed");
                Err(e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(elapsed_ms, %message, "kernel call panicked");
                Err(KernelError::Panicked(message))
            }
        }
    }
}

impl std::fmt::Debug for NativeComputeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeComputeBridge").finish_non_exhaustive()
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
