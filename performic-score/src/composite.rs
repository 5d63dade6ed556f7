//! Composite Score
//!
//! `0.20·single + 0.35·multi + 0.20·ram + 0.25·gpu`. An absent sub-score
//! contributes 0, so a partial run is scored optimistically low rather than
//! rejected.

use performic_payload::BenchmarkResult;
use serde::{Deserialize, Serialize};

/// Weight of the single-core score
pub const SINGLE_CORE_WEIGHT: f64 = 0.20;
/// Weight of the multi-core score
pub const MULTI_CORE_WEIGHT: f64 = 0.35;
/// Weight of the RAM score
pub const RAM_WEIGHT: f64 = 0.20;
/// Weight of the GPU score
pub const GPU_WEIGHT: f64 = 0.25;

/// The four inputs of the composite score. `None` means "not measured".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    /// Single-core CPU score
    pub single_core: Option<f64>,
    /// Multi-core CPU score
    pub multi_core: Option<f64>,
    /// Memory score
    pub ram: Option<f64>,
    /// GPU score
    pub gpu: Option<f64>,
}

impl SubScores {
    /// Collect sub-scores from a decoded result and an optional GPU score.
    ///
    /// A failed result contributes no CPU or memory scores.
    pub fn from_result(result: &BenchmarkResult, gpu: Option<f64>) -> Self {
        Self {
            single_core: result.single_core(),
            multi_core: result.multi_core(),
            ram: result.ram_score(),
            gpu,
        }
    }

    /// Weighted composite of these sub-scores
    pub fn composite(&self) -> f64 {
        composite_score(self)
    }
}

/// Weighted composite score; absent or non-finite inputs count as 0
pub fn composite_score(scores: &SubScores) -> f64 {
    let weighted = |value: Option<f64>, weight: f64| match value {
        Some(v) if v.is_finite() => v * weight,
        _ => 0.0,
    };

    weighted(scores.single_core, SINGLE_CORE_WEIGHT)
        + weighted(scores.multi_core, MULTI_CORE_WEIGHT)
        + weighted(scores.ram, RAM_WEIGHT)
        + weighted(scores.gpu, GPU_WEIGHT)
}
