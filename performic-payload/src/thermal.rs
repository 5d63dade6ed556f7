//! Thermal Samples

use serde::{Deserialize, Serialize};

/// One temperature reading taken during a run.
///
/// `elapsed_ms` is measured from the run's start on a monotonic clock, so a
/// sequence produced by one sampler is non-decreasing in `elapsed_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalPoint {
    /// Milliseconds since the run started
    pub elapsed_ms: u64,
    /// Probe reading in degrees Celsius
    pub temperature_c: f32,
}

impl ThermalPoint {
    /// Create a new thermal point
    #[inline]
    pub fn new(elapsed_ms: u64, temperature_c: f32) -> Self {
        Self {
            elapsed_ms,
            temperature_c,
        }
    }
}
