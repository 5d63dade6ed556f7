//! CSV Output
//!
//! One row per thermal sample, for plotting the temperature curve of a run.

use crate::report::Report;
use std::fmt::Write;

/// Generate a CSV of the run's thermal series
pub fn generate_csv_report(report: &Report) -> String {
    let mut csv = String::from("session,elapsed_ms,temperature_c\n");
    for point in &report.thermal.points {
        let _ = writeln!(
            csv,
            "{},{},{:.2}",
            report.meta.session, point.elapsed_ms, point.temperature_c
        );
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{GpuSection, ReportMeta, SystemInfo};
    use performic_payload::{BenchmarkResult, ThermalPoint};
    use performic_score::ReferenceScores;

    #[test]
    fn test_one_row_per_point() {
        let report = Report::new(
            ReportMeta::new(9, 1000, SystemInfo::default()),
            BenchmarkResult::success(""),
            vec![ThermalPoint::new(0, 30.0), ThermalPoint::new(500, 31.25)],
            GpuSection::Skipped,
            &ReferenceScores::default(),
        );
        let csv = generate_csv_report(&report);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "session,elapsed_ms,temperature_c",
                "9,0,30.00",
                "9,500,31.25"
            ]
        );
    }

    #[test]
    fn test_empty_series_has_header_only() {
        let report = Report::new(
            ReportMeta::new(1, 0, SystemInfo::default()),
            BenchmarkResult::failure("boom"),
            Vec::new(),
            GpuSection::Skipped,
            &ReferenceScores::default(),
        );
        assert_eq!(generate_csv_report(&report).lines().count(), 1);
    }
}
