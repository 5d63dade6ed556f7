//! External Compute Kernel
//!
//! Runs the configured kernel program; its stdout is the result payload.
//! Output past the payload size limit kills the kernel instead of buffering it.

use crate::supervisor::ProcessHandle;
use performic_core::{ComputeKernel, KernelError};
use performic_payload::MAX_PAYLOAD_SIZE;
use std::time::Duration;
use tracing::info;

/// Compute kernel backed by an external command
#[derive(Debug, Clone)]
pub struct CommandKernel {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandKernel {
    /// Kernel running `argv`, killed after `timeout`
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }
}

impl ComputeKernel for CommandKernel {
    fn invoke(&self) -> Result<String, KernelError> {
        info!(command = ?self.argv, "running compute kernel");
        let mut process = ProcessHandle::spawn(&self.argv, &[], self.timeout)?;
        Ok(process.collect_stdout(MAX_PAYLOAD_SIZE)?)
    }
}
