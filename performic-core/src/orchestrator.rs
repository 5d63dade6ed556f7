//! Benchmark Orchestrator
//!
//! State machine composing the sampler, the kernel bridge and the decoder:
//!
//! ```text
//! Idle ──start()──► Preparing ──► Running ──► Finalizing ──► Idle
//!                   prepare hook   sampler ∥    stop + join sampler
//!                   thermal gate   kernel call  decode, cleanup hook
//!                                               deliver (result, thermal)
//! ```
//!
//! `start()` returns immediately; everything from Preparing on runs on a
//! dedicated worker thread. The completion handler is dispatched exactly once,
//! after the sampler has been stopped, on the caller's completion context.

use crate::clock::RunClock;
use crate::context::CompletionContext;
use crate::hooks::{SystemHooks, run_best_effort};
use crate::kernel::NativeComputeBridge;
use crate::session::SessionToken;
use crate::thermal::{
    DEFAULT_JOIN_GRACE, DEFAULT_SAMPLE_INTERVAL, TemperatureProbe, ThermalSampler,
};
use performic_payload::{BenchmarkResult, ResultDecoder, ThermalPoint};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Message reported when the thermal start gate refuses a run
pub const OVERHEAT_MESSAGE: &str = "Device is too hot. Please let it cool down and try again.";

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// No run in progress
    Idle,
    /// Prepare hook and thermal gate
    Preparing,
    /// Sampler and kernel executing
    Running,
    /// Stopping the sampler, decoding, cleanup and delivery
    Finalizing,
}

/// Errors returned by [`BenchmarkOrchestrator::start`]
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("a benchmark run is already in progress ({0:?})")]
    AlreadyRunning(OrchestratorState),

    #[error("failed to spawn orchestrator worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Run-level settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Thermal sampling cadence
    pub sample_interval: Duration,
    /// Extra wait on top of one interval when stopping the sampler
    pub join_grace: Duration,
    /// Refuse to start when the probe reads at or above this temperature
    pub max_start_temperature: Option<f32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            join_grace: DEFAULT_JOIN_GRACE,
            max_start_temperature: None,
        }
    }
}

/// Everything a completed run delivers
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Session this run belonged to
    pub session: SessionToken,
    /// Decoded kernel result, or a failure result
    pub result: BenchmarkResult,
    /// Thermal series captured while the kernel ran
    pub thermal: Vec<ThermalPoint>,
    /// Wall-clock duration from Preparing to delivery
    pub elapsed: Duration,
}

/// Handle to a run started by [`BenchmarkOrchestrator::start`]
#[derive(Debug)]
pub struct RunHandle {
    session: SessionToken,
    worker: JoinHandle<()>,
}

impl RunHandle {
    /// Session of the started run
    pub fn session(&self) -> SessionToken {
        self.session
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until the worker thread exits
    pub fn join(self) {
        if self.worker.join().is_err() {
            warn!(session = %self.session, "orchestrator worker terminated abnormally");
        }
    }
}

fn lock(state: &Mutex<OrchestratorState>) -> MutexGuard<'_, OrchestratorState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Puts the orchestrator back to Idle when the worker finishes, even on unwind
struct IdleOnDrop(Arc<Mutex<OrchestratorState>>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        *lock(&self.0) = OrchestratorState::Idle;
    }
}

/// Composes one full benchmark run
pub struct BenchmarkOrchestrator {
    bridge: NativeComputeBridge,
    probe: Arc<dyn TemperatureProbe>,
    hooks: Arc<dyn SystemHooks>,
    config: OrchestratorConfig,
    state: Arc<Mutex<OrchestratorState>>,
}

impl BenchmarkOrchestrator {
    /// Create an idle orchestrator
    pub fn new(
        bridge: NativeComputeBridge,
        probe: Arc<dyn TemperatureProbe>,
        hooks: Arc<dyn SystemHooks>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            bridge,
            probe,
            hooks,
            config,
            state: Arc::new(Mutex::new(OrchestratorState::Idle)),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> OrchestratorState {
        *lock(&self.state)
    }

    /// Run settings
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Start a run without blocking the caller.
    ///
    /// `on_complete` is dispatched exactly once on `context`. The orchestrator is
    /// already back to Idle when it runs, so the handler may start the next run.
    pub fn start<F>(
        &self,
        context: Arc<dyn CompletionContext>,
        on_complete: F,
    ) -> Result<RunHandle, OrchestratorError>
    where
        F: FnOnce(RunOutcome) + Send + 'static,
    {
        {
            let mut state = lock(&self.state);
            if *state != OrchestratorState::Idle {
                return Err(OrchestratorError::AlreadyRunning(*state));
            }
            *state = OrchestratorState::Preparing;
        }

        let session = SessionToken::next();
        let run = Run {
            session,
            bridge: self.bridge.clone(),
            probe: Arc::clone(&self.probe),
            hooks: Arc::clone(&self.hooks),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        };

        let spawned = thread::Builder::new()
            .name("performic-orchestrator".to_string())
            .spawn(move || {
                let reset = IdleOnDrop(Arc::clone(&run.state));
                let outcome = run.execute();
                drop(reset);
                context.dispatch(Box::new(move || on_complete(outcome)));
            });

        match spawned {
            Ok(worker) => {
                info!(%session, "benchmark run started");
                Ok(RunHandle { session, worker })
            }
            Err(e) => {
                *lock(&self.state) = OrchestratorState::Idle;
                Err(OrchestratorError::Spawn(e))
            }
        }
    }
}

impl std::fmt::Debug for BenchmarkOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkOrchestrator")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Per-run state moved onto the worker thread
struct Run {
    session: SessionToken,
    bridge: NativeComputeBridge,
    probe: Arc<dyn TemperatureProbe>,
    hooks: Arc<dyn SystemHooks>,
    config: OrchestratorConfig,
    state: Arc<Mutex<OrchestratorState>>,
}

impl Run {
    fn enter(&self, next: OrchestratorState) {
        *lock(&self.state) = next;
        debug!(session = %self.session, state = ?next, "orchestrator state changed");
    }

    fn execute(&self) -> RunOutcome {
        let clock = RunClock::start();

        let hooks = Arc::clone(&self.hooks);
        run_best_effort("prepare", move || hooks.prepare());

        let (result, thermal) = match self.check_start_temperature() {
            Some(refused) => {
                self.enter(OrchestratorState::Finalizing);
                (refused, Vec::new())
            }
            None => self.measure(clock),
        };

        let hooks = Arc::clone(&self.hooks);
        run_best_effort("cleanup", move || hooks.cleanup());

        let elapsed = clock.elapsed();
        info!(
            session = %self.session,
            success = result.is_success(),
            thermal_points = thermal.len(),
            elapsed_ms = clock.elapsed_ms(),
            "benchmark run finished"
        );

        RunOutcome {
            session: self.session,
            result,
            thermal,
            elapsed,
        }
    }

    /// Returns a failure result when the device is already too hot to start
    fn check_start_temperature(&self) -> Option<BenchmarkResult> {
        let limit = self.config.max_start_temperature?;
        let reading = catch_unwind(AssertUnwindSafe(|| self.probe.read_celsius()));
        match reading {
            Ok(temperature_c) if temperature_c >= limit => {
                warn!(session = %self.session, temperature_c, limit, "device too hot to start");
                Some(BenchmarkResult::failure(OVERHEAT_MESSAGE))
            }
            Ok(_) => None,
            Err(_) => {
                warn!(session = %self.session, "temperature probe panicked; start gate skipped");
                None
            }
        }
    }

    fn measure(&self, clock: RunClock) -> (BenchmarkResult, Vec<ThermalPoint>) {
        self.enter(OrchestratorState::Running);

        let mut sampler =
            ThermalSampler::new(Arc::clone(&self.probe)).with_join_grace(self.config.join_grace);
        let sampling = sampler.start_with_clock(self.config.sample_interval, clock);
        if let Err(e) = &sampling {
            warn!(session = %self.session, error = %e, "thermal sampler did not start; continuing without thermal data");
        }

        let payload = self.bridge.invoke();

        self.enter(OrchestratorState::Finalizing);

        let thermal = match sampling {
            Ok(()) => sampler.stop().unwrap_or_else(|e| {
                warn!(session = %self.session, error = %e, "thermal series discarded");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };

        let result = match payload {
            Ok(payload) => ResultDecoder.decode(&payload),
            Err(e) => BenchmarkResult::failure(format!("Native benchmark failed: {}", e)),
        };

        (result, thermal)
    }
}
