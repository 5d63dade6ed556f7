//! Session Execution
//!
//! Drives one full session from the CLI's thread: the orchestrated CPU/memory
//! run, then the optional GPU test. Completion handlers are queued on a
//! [`ChannelContext`] and drained here, so results are handled on the caller's
//! thread while the spinner keeps ticking.

use indicatif::{ProgressBar, ProgressStyle};
use performic_core::{
    BenchmarkOrchestrator, ChannelContext, CompletionQueue, ComputeKernel, GpuKernel, GpuOutcome,
    GpuTestController, NativeComputeBridge, OrchestratorConfig, RenderSurface, RunOutcome,
    SessionToken, SystemHooks, TemperatureProbe,
};
use performic_report::GpuSection;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// How often the CLI thread wakes to drain completions and refresh the spinner
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Label of the off-screen surface the CLI binds the GPU test to
pub const HEADLESS_SURFACE: &str = "performic-headless";

/// Source of the GPU score
pub enum GpuPlan {
    /// No GPU test
    Skip,
    /// Score supplied up front (e.g. measured elsewhere)
    Fixed(f64),
    /// Run a GPU kernel on a headless surface
    Kernel(Arc<dyn GpuKernel>),
}

/// Everything needed to run one session
pub struct SessionPlan {
    /// Orchestrator settings
    pub orchestrator: OrchestratorConfig,
    /// CPU/memory kernel
    pub kernel: Arc<dyn ComputeKernel>,
    /// Temperature source
    pub probe: Arc<dyn TemperatureProbe>,
    /// Prepare/cleanup hooks
    pub hooks: Arc<dyn SystemHooks>,
    /// GPU test
    pub gpu: GpuPlan,
}

/// Outcome of a full session
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Orchestrated run
    pub run: RunOutcome,
    /// GPU test
    pub gpu: GpuSection,
}

/// Run a session to completion, showing progress on `progress`
pub fn execute_session(plan: SessionPlan, progress: &ProgressBar) -> anyhow::Result<SessionOutcome> {
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(POLL_INTERVAL);

    let (context, queue) = ChannelContext::new();
    let context = Arc::new(context);

    progress.set_message("Running CPU and memory benchmark...");
    let orchestrator = BenchmarkOrchestrator::new(
        NativeComputeBridge::new(plan.kernel),
        plan.probe,
        plan.hooks,
        plan.orchestrator,
    );
    let slot: Arc<Mutex<Option<RunOutcome>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    let handle = orchestrator.start(context.clone(), move |outcome| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(outcome);
        }
    })?;
    let run = drain_until(&queue, &slot);
    handle.join();

    let gpu = if !run.result.is_success() {
        if !matches!(plan.gpu, GpuPlan::Skip) {
            info!("CPU run failed; GPU test skipped");
        }
        GpuSection::Skipped
    } else {
        match plan.gpu {
            GpuPlan::Skip => GpuSection::Skipped,
            GpuPlan::Fixed(score) => GpuSection::Completed { score },
            GpuPlan::Kernel(kernel) => {
                progress.set_message("Running GPU test...");
                run_gpu(kernel, context, &queue, progress)
            }
        }
    };

    progress.finish_and_clear();
    Ok(SessionOutcome { run, gpu })
}

fn run_gpu(
    kernel: Arc<dyn GpuKernel>,
    context: Arc<ChannelContext>,
    queue: &CompletionQueue,
    progress: &ProgressBar,
) -> GpuSection {
    let controller = GpuTestController::new(kernel, context);
    let surface = RenderSurface::headless(HEADLESS_SURFACE);

    let bar = progress.clone();
    let listener = Arc::new(move |_: SessionToken, fps: u32| {
        if fps == 0 {
            bar.set_message("GPU test: measuring...");
        } else {
            bar.set_message(format!("GPU test: {} fps", fps));
        }
    });

    let slot: Arc<Mutex<Option<GpuOutcome>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    controller.bind(&surface, listener, move |outcome| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(outcome);
        }
    });

    match drain_until(queue, &slot) {
        GpuOutcome::Completed { score, .. } => GpuSection::Completed { score },
        GpuOutcome::Aborted { reason, .. } => {
            warn!(%reason, "GPU test aborted");
            GpuSection::Aborted { reason }
        }
    }
}

/// Run queued completions on this thread until `slot` is filled
fn drain_until<T>(queue: &CompletionQueue, slot: &Mutex<Option<T>>) -> T {
    loop {
        queue.run_next(POLL_INTERVAL);
        let taken = slot.lock().ok().and_then(|mut s| s.take());
        if let Some(value) = taken {
            return value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use performic_core::{KernelError, NoopHooks};

    fn plan(payload: &'static str, gpu: GpuPlan) -> SessionPlan {
        SessionPlan {
            orchestrator: OrchestratorConfig {
                sample_interval: Duration::from_millis(5),
                ..OrchestratorConfig::default()
            },
            kernel: Arc::new(move || {
                std::thread::sleep(Duration::from_millis(20));
                Ok::<_, KernelError>(payload.to_string())
            }),
            probe: Arc::new(|| 36.0_f32),
            hooks: Arc::new(NoopHooks),
            gpu,
        }
    }

    #[test]
    fn test_session_with_fixed_gpu_score() {
        let outcome = execute_session(
            plan(r#"{"success":true,"singleCore":1200}"#, GpuPlan::Fixed(2000.0)),
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert!(outcome.run.result.is_success());
        assert!(!outcome.run.thermal.is_empty());
        assert_eq!(outcome.gpu, GpuSection::Completed { score: 2000.0 });
    }

    #[test]
    fn test_session_with_gpu_kernel() {
        let kernel: Arc<dyn GpuKernel> = Arc::new(
            |_: &RenderSurface, fps: &performic_core::FpsReporter| -> Result<f64, KernelError> {
                fps.report(0);
                fps.report(61);
                Ok(6100.0)
            },
        );
        let outcome = execute_session(
            plan(r#"{"success":true}"#, GpuPlan::Kernel(kernel)),
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert_eq!(outcome.gpu.score(), Some(6100.0));
    }

    #[test]
    fn test_failed_run_skips_gpu() {
        let outcome = execute_session(
            plan(r#"{"success":false,"message":"thermal abort"}"#, GpuPlan::Fixed(2000.0)),
            &ProgressBar::hidden(),
        )
        .unwrap();
        assert!(!outcome.run.result.is_success());
        assert_eq!(outcome.gpu, GpuSection::Skipped);
    }
}
