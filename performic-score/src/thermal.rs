//! Thermal Summary

use performic_payload::ThermalPoint;
use serde::Serialize;

/// Endpoints, delta and peak of one thermal series.
///
/// `delta_c` is last minus first. An empty series reports every field as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ThermalSummary {
    /// First reading
    pub start_c: f32,
    /// Last reading
    pub end_c: f32,
    /// `end_c - start_c`
    pub delta_c: f32,
    /// Highest reading
    pub peak_c: f32,
    /// Elapsed time of the last reading
    pub duration_ms: u64,
    /// Number of readings
    pub samples: usize,
}

impl ThermalSummary {
    /// Summarize a thermal series
    pub fn from_points(points: &[ThermalPoint]) -> Self {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Self::default();
        };

        let peak_c = points
            .iter()
            .map(|p| p.temperature_c)
            .fold(f32::NEG_INFINITY, f32::max);

        Self {
            start_c: first.temperature_c,
            end_c: last.temperature_c,
            delta_c: last.temperature_c - first.temperature_c,
            peak_c,
            duration_ms: last.elapsed_ms,
            samples: points.len(),
        }
    }
}
