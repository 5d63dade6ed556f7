#![warn(missing_docs)]
//! # Performic
//!
//! Device benchmark orchestration with concurrent thermal sampling and
//! composite scoring.
//!
//! Performic drives one benchmark session end to end:
//! - **Thermal Sampling**: a background sampler records the device temperature while the kernel runs
//! - **Opaque Kernels**: the compute kernel is a blocking black box returning one JSON payload
//! - **Defensive Decoding**: malformed payloads become failure results, never crashes
//! - **GPU Handshake**: the GPU test starts only once its render surface is valid, with live FPS
//! - **Composite Scoring**: weighted single-core, multi-core, RAM and GPU sub-scores
//!
//! ## Quick Start
//!
//! ```ignore
//! use performic::prelude::*;
//! use std::sync::Arc;
//!
//! let kernel = || Ok::<_, KernelError>(r#"{"success":true,"singleCore":1200}"#.to_string());
//! let orchestrator = BenchmarkOrchestrator::new(
//!     NativeComputeBridge::new(Arc::new(kernel)),
//!     Arc::new(|| 41.5f32),
//!     Arc::new(NoopHooks),
//!     OrchestratorConfig::default(),
//! );
//!
//! orchestrator.start(Arc::new(InlineContext), |outcome| {
//!     let scores = SubScores::from_result(&outcome.result, None);
//!     println!("composite {:.0}", scores.composite());
//! })?;
//! ```

// Re-export the engine
pub use performic_core::{
    BenchmarkOrchestrator, ChannelContext, CompletionContext, CompletionQueue, ComputeKernel,
    FpsListener, FpsReporter, GpuKernel, GpuOutcome, GpuState, GpuTestController, InlineContext,
    KernelError, NativeComputeBridge, NoopHooks, OVERHEAT_MESSAGE, OrchestratorConfig,
    OrchestratorError, OrchestratorState, RenderSurface, RunHandle, RunOutcome, SessionToken,
    SystemHooks, TemperatureProbe, ThermalSampler,
};

// Re-export the data model
pub use performic_payload::{BenchmarkResult, DecodeError, ResultDecoder, ThermalPoint, decode};

// Re-export scoring
pub use performic_score::{
    HistorySummary, ReferenceScores, SubScores, ThermalSummary, composite_score, fraction,
    summarize,
};

// Re-export reports
pub use performic_report::{OutputFormat, Report, generate_csv_report, generate_json_report};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchmarkOrchestrator, BenchmarkResult, GpuOutcome, GpuTestController, InlineContext,
        KernelError, NativeComputeBridge, NoopHooks, OrchestratorConfig, RenderSurface, SubScores,
        ThermalPoint,
    };
}

/// Run the Performic CLI.
///
/// ```ignore
/// fn main() {
///     performic::run().unwrap();
/// }
/// ```
pub use performic_cli::run;
