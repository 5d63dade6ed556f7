//! Reference Scores and Progress Fractions
//!
//! Fixed calibration values a result is displayed against. They are external
//! configuration, not derived from any run.

use crate::composite::SubScores;
use performic_payload::BenchmarkResult;
use serde::{Deserialize, Serialize};

/// Per-metric reference values; a score equal to its reference fills the bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceScores {
    /// Single-core reference score
    pub single_core: f64,
    /// Multi-core reference score
    pub multi_core: f64,
    /// RAM reference score
    pub ram: f64,
    /// GPU reference score
    pub gpu: f64,
    /// RAM bandwidth reference (GB/s)
    pub ram_bandwidth_gbs: f64,
    /// L1 bandwidth reference (GB/s)
    pub l1_bandwidth_gbs: f64,
    /// L2 bandwidth reference (GB/s)
    pub l2_bandwidth_gbs: f64,
}

impl Default for ReferenceScores {
    fn default() -> Self {
        Self {
            single_core: 2000.0,
            multi_core: 8000.0,
            ram: 2000.0,
            gpu: 6000.0,
            ram_bandwidth_gbs: 20.0,
            l1_bandwidth_gbs: 100.0,
            l2_bandwidth_gbs: 50.0,
        }
    }
}

/// `clamp(value / reference, 0, 1)`.
///
/// A non-positive or non-finite reference, or a NaN value, yields 0.
pub fn fraction(value: f64, reference: f64) -> f64 {
    if !reference.is_finite() || reference <= 0.0 || value.is_nan() {
        return 0.0;
    }
    (value / reference).clamp(0.0, 1.0)
}

/// Progress fractions for every displayed metric; `None` when not measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Fractions {
    /// Single-core progress
    pub single_core: Option<f64>,
    /// Multi-core progress
    pub multi_core: Option<f64>,
    /// RAM score progress
    pub ram: Option<f64>,
    /// GPU progress
    pub gpu: Option<f64>,
    /// RAM bandwidth progress
    pub ram_bandwidth: Option<f64>,
    /// L1 bandwidth progress
    pub l1_bandwidth: Option<f64>,
    /// L2 bandwidth progress
    pub l2_bandwidth: Option<f64>,
}

impl ReferenceScores {
    /// Progress fractions for a result and its sub-scores
    pub fn fractions(&self, scores: &SubScores, result: &BenchmarkResult) -> Fractions {
        let against = |value: Option<f64>, reference: f64| value.map(|v| fraction(v, reference));
        Fractions {
            single_core: against(scores.single_core, self.single_core),
            multi_core: against(scores.multi_core, self.multi_core),
            ram: against(scores.ram, self.ram),
            gpu: against(scores.gpu, self.gpu),
            ram_bandwidth: against(result.ram_bandwidth_gbs(), self.ram_bandwidth_gbs),
            l1_bandwidth: against(result.l1_bandwidth_gbs(), self.l1_bandwidth_gbs),
            l2_bandwidth: against(result.l2_bandwidth_gbs(), self.l2_bandwidth_gbs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_clamps() {
        assert_eq!(fraction(4000.0, 2000.0), 1.0);
        assert_eq!(fraction(-10.0, 2000.0), 0.0);
        assert_eq!(fraction(1000.0, 2000.0), 0.5);
        assert_eq!(fraction(f64::INFINITY, 2000.0), 1.0);
    }

    #[test]
    fn test_fraction_degenerate_reference() {
        assert_eq!(fraction(100.0, 0.0), 0.0);
        assert_eq!(fraction(100.0, -1.0), 0.0);
        assert_eq!(fraction(100.0, f64::NAN), 0.0);
        assert_eq!(fraction(f64::NAN, 2000.0), 0.0);
    }

    #[test]
    fn test_fractions_keep_absent_metrics_absent() {
        let result = BenchmarkResult::success("")
            .with_single_core(1000.0)
            .with_bandwidths(Some(10.0), None, Some(100.0));
        let scores = SubScores::from_result(&result, None);
        let fractions = ReferenceScores::default().fractions(&scores, &result);

        assert_eq!(fractions.single_core, Some(0.5));
        assert_eq!(fractions.multi_core, None);
        assert_eq!(fractions.gpu, None);
        assert_eq!(fractions.ram_bandwidth, Some(0.5));
        assert_eq!(fractions.l1_bandwidth, None);
        assert_eq!(fractions.l2_bandwidth, Some(1.0));
    }

    #[test]
    fn test_partial_reference_table_fills_defaults() {
        let refs: ReferenceScores = serde_json::from_str(r#"{"gpu": 9000.0}"#).unwrap();
        assert_eq!(refs.gpu, 9000.0);
        assert_eq!(refs.single_core, 2000.0);
    }
}
