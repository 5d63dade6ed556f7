#![warn(missing_docs)]
//! Performic Score Engine
//!
//! Turns a decoded result into the numbers a user sees:
//! - Weighted composite of the four sub-scores
//! - Progress fractions against calibrated reference values
//! - Thermal delta and peak over a run's thermal series
//! - Summary statistics over per-iteration score histories

mod composite;
mod reference;
mod summary;
mod thermal;

pub use composite::{
    GPU_WEIGHT, MULTI_CORE_WEIGHT, RAM_WEIGHT, SINGLE_CORE_WEIGHT, SubScores, composite_score,
};
pub use reference::{Fractions, ReferenceScores, fraction};
pub use summary::{HistorySummary, compute_percentile, summarize};
pub use thermal::ThermalSummary;

/// FPS-to-score multiplier used by the GPU test
pub const GPU_SCORE_PER_FPS: f64 = 100.0;

/// GPU score from an average frame rate
pub fn gpu_score_from_fps(average_fps: f64) -> f64 {
    if average_fps.is_finite() && average_fps > 0.0 {
        average_fps * GPU_SCORE_PER_FPS
    } else {
        0.0
    }
}
