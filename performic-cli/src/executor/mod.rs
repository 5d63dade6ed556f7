//! Session Executor
//!
//! ## Pipeline Overview
//!
//! ```text
//! SessionPlan (kernel, probe, hooks, GPU plan)
//!       │
//!       ▼
//! ┌─────────────┐
//! │   session   │  Orchestrated run + GPU test, completions drained here
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Metadata + scores + thermal summary
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```

mod formatting;
mod metadata;
mod report;
mod session;

pub use formatting::{format_human_output, format_result};
pub use metadata::collect_system_info;
pub use report::build_report;
pub use session::{GpuPlan, HEADLESS_SURFACE, SessionOutcome, SessionPlan, execute_session};
