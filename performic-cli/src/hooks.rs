//! External Preparation Hooks
//!
//! Prepare and cleanup commands run under the same supervision as kernels, so
//! a hanging hook is killed at its deadline instead of stalling the run.

use crate::supervisor::ProcessHandle;
use performic_core::{HookError, SystemHooks};
use std::time::Duration;
use tracing::debug;

/// Runs optional prepare / cleanup commands
#[derive(Debug, Clone)]
pub struct CommandHooks {
    prepare: Vec<String>,
    cleanup: Vec<String>,
    timeout: Duration,
}

impl CommandHooks {
    /// Hooks running the given commands, each killed after `timeout`; an empty command is skipped
    pub fn new(prepare: Vec<String>, cleanup: Vec<String>, timeout: Duration) -> Self {
        Self {
            prepare,
            cleanup,
            timeout,
        }
    }

    fn run(&self, argv: &[String]) -> Result<(), HookError> {
        if argv.is_empty() {
            return Ok(());
        }
        let mut process = ProcessHandle::spawn(argv, &[], self.timeout)?;
        process.for_each_line(|line| debug!(line, "hook output"))?;
        Ok(())
    }
}

impl SystemHooks for CommandHooks {
    fn prepare(&self) -> Result<(), HookError> {
        self.run(&self.prepare)
    }

    fn cleanup(&self) -> Result<(), HookError> {
        self.run(&self.cleanup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_commands_are_skipped() {
        let hooks = CommandHooks::new(Vec::new(), Vec::new(), Duration::from_secs(1));
        assert!(hooks.prepare().is_ok());
        assert!(hooks.cleanup().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_reports_failure_status() {
        let hooks = CommandHooks::new(
            vec!["sh".into(), "-c".into(), "exit 0".into()],
            vec!["sh".into(), "-c".into(), "exit 2".into()],
            Duration::from_secs(10),
        );
        assert!(hooks.prepare().is_ok());
        assert!(hooks.cleanup().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_hanging_hook_times_out() {
        let hooks = CommandHooks::new(
            vec!["sleep".into(), "30".into()],
            Vec::new(),
            Duration::from_millis(200),
        );
        let begin = std::time::Instant::now();
        let err = hooks.prepare().unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(begin.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_hanging_hook_does_not_block_delivery() {
        use performic_core::{
            BenchmarkOrchestrator, InlineContext, KernelError, NativeComputeBridge,
            OrchestratorConfig,
        };
        use std::sync::Arc;

        let hooks = CommandHooks::new(
            vec!["sleep".into(), "30".into()],
            vec!["sleep".into(), "30".into()],
            Duration::from_millis(200),
        );
        let kernel = || Ok::<_, KernelError>(r#"{"success":true}"#.to_string());
        let orchestrator = BenchmarkOrchestrator::new(
            NativeComputeBridge::new(Arc::new(kernel)),
            Arc::new(|| 30.0f32),
            Arc::new(hooks),
            OrchestratorConfig::default(),
        );

        let (tx, rx) = crossbeam_channel::bounded(1);
        let handle = orchestrator
            .start(Arc::new(InlineContext), move |outcome| {
                let _ = tx.send(outcome);
            })
            .unwrap();

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(outcome.result.is_success());
        handle.join();
    }
}
