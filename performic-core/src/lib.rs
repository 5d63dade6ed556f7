#![warn(missing_docs)]
//! Performic Core - Orchestration Engine
//!
//! This crate runs one benchmark session end to end:
//! - `ThermalSampler` for background temperature capture with a bounded stop
//! - `NativeComputeBridge` around the blocking compute kernel
//! - `BenchmarkOrchestrator`, the Idle → Preparing → Running → Finalizing machine
//! - `GpuTestController` for the surface-gated GPU test with live FPS
//!
//! Completion handlers are delivered on a caller-chosen [`CompletionContext`].

mod clock;
mod context;
mod gpu;
mod hooks;
mod kernel;
mod orchestrator;
mod session;
mod thermal;

pub use clock::RunClock;
pub use context::{ChannelContext, CompletionContext, CompletionQueue, InlineContext, Task};
pub use gpu::{
    FpsListener, FpsReporter, GpuKernel, GpuOutcome, GpuState, GpuTestController, RenderSurface,
};
pub use hooks::{HookError, NoopHooks, SystemHooks};
pub use kernel::{ComputeKernel, KernelError, NativeComputeBridge};
pub use orchestrator::{
    BenchmarkOrchestrator, OVERHEAT_MESSAGE, OrchestratorConfig, OrchestratorError,
    OrchestratorState, RunHandle, RunOutcome,
};
pub use session::SessionToken;
pub use thermal::{
    DEFAULT_JOIN_GRACE, DEFAULT_SAMPLE_INTERVAL, SamplerError, TemperatureProbe, ThermalSampler,
};
