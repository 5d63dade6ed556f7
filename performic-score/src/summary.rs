//! History Summaries
//!
//! Per-iteration score histories are short (tens of points), so everything is
//! computed from the full series with no outlier rejection.

use serde::Serialize;

/// Summary statistics over one score history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    /// Number of points
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// 50th percentile
    pub median: f64,
    /// Sample standard deviation (0 below two points)
    pub std_dev: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// 90th percentile
    pub p90: f64,
}

/// Percentile with linear interpolation between nearest ranks.
///
/// Returns 0 for an empty series. NaN values sort last.
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    match samples {
        [] => 0.0,
        [only] => *only,
        _ => {
            let mut sorted = samples.to_vec();
            sorted.sort_by(f64::total_cmp);
            interpolate(&sorted, percentile)
        }
    }
}

fn interpolate(sorted: &[f64], percentile: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = (percentile / 100.0).clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(last);
    let weight = rank - lower as f64;
    sorted[lower] + weight * (sorted[upper] - sorted[lower])
}

/// Summarize a history; an empty history yields all zeros
pub fn summarize(history: &[f64]) -> HistorySummary {
    if history.is_empty() {
        return HistorySummary::default();
    }

    let mut sorted = history.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std_dev = if n < 2 {
        0.0
    } else {
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };

    HistorySummary {
        count: n,
        mean,
        median: interpolate(&sorted, 50.0),
        std_dev,
        min: sorted[0],
        max: sorted[n - 1],
        p90: interpolate(&sorted, 90.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        let samples = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        assert!((compute_percentile(&samples, 50.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_interpolates_between_ranks() {
        let samples: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        assert!((compute_percentile(&samples, 90.0) - 90.1).abs() < 1e-9);
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(compute_percentile(&[], 50.0), 0.0);
        assert_eq!(compute_percentile(&[42.0], 99.0), 42.0);
        assert_eq!(compute_percentile(&[1.0, 2.0], 150.0), 2.0);
    }

    #[test]
    fn test_summarize_history() {
        let summary = summarize(&[1180.0, 1200.0, 1220.0, 1200.0]);
        assert_eq!(summary.count, 4);
        assert!((summary.mean - 1200.0).abs() < 1e-9);
        assert!((summary.median - 1200.0).abs() < 1e-9);
        assert_eq!(summary.min, 1180.0);
        assert_eq!(summary.max, 1220.0);
        assert!(summary.std_dev > 0.0);
    }

    #[test]
    fn test_summarize_empty_and_single() {
        assert_eq!(summarize(&[]), HistorySummary::default());

        let single = summarize(&[900.0]);
        assert_eq!(single.count, 1);
        assert_eq!(single.std_dev, 0.0);
        assert_eq!(single.p90, 900.0);
    }
}
