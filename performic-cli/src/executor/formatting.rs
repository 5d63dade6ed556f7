//! Output Formatting
//!
//! Human-readable output formatting for session reports.
//!
//! Generates terminal-friendly output with:
//! - Run status and kernel message
//! - Sub-scores with progress bars against the reference values
//! - History summaries and bandwidth figures
//! - Thermal summary and GPU outcome

use performic_payload::BenchmarkResult;
use performic_report::{GpuSection, Report};
use performic_score::HistorySummary;
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

fn bar(fraction: Option<f64>) -> String {
    let filled = fraction
        .map(|f| (f.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize)
        .unwrap_or(0);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn score(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.0}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn history_line(out: &mut String, name: &str, summary: &HistorySummary) {
    if summary.count > 1 {
        let _ = writeln!(
            out,
            "  {:<12} n={}  mean {:.1}  median {:.1}  stddev {:.1}  min {:.1}  max {:.1}",
            name, summary.count, summary.mean, summary.median, summary.std_dev, summary.min,
            summary.max
        );
    }
}

/// Format a decoded result on its own (no scores, no thermal data)
pub fn format_result(result: &BenchmarkResult) -> String {
    let mut out = String::new();
    if result.is_success() {
        let _ = writeln!(out, "✓ success");
    } else {
        let _ = writeln!(out, "✗ failed: {}", result.message());
        return out;
    }
    if !result.message().is_empty() {
        let _ = writeln!(out, "  message: {}", result.message());
    }

    let fields = [
        ("single-core", result.single_core()),
        ("multi-core", result.multi_core()),
        ("ram", result.ram_score()),
        ("ram GB/s", result.ram_bandwidth_gbs()),
        ("L1 GB/s", result.l1_bandwidth_gbs()),
        ("L2 GB/s", result.l2_bandwidth_gbs()),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "  {:<12} {:.2}", name, value);
        }
    }
    let _ = writeln!(
        out,
        "  history      single-core {} points, multi-core {} points",
        result.single_core_history().len(),
        result.multi_core_history().len()
    );
    out
}

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut out = String::new();

    out.push('\n');
    out.push_str("Performic Results\n");
    out.push_str(&"=".repeat(60));
    out.push_str("\n\n");

    let _ = writeln!(
        out,
        "{} on {} ({} cores, {:.1} GB)  {}",
        report.meta.system.os,
        report.meta.system.cpu,
        report.meta.system.cpu_cores,
        report.meta.system.memory_gb,
        report.meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out.push('\n');

    if report.is_success() {
        let _ = writeln!(out, "✓ Run completed in {:.1}s", report.meta.elapsed_ms as f64 / 1000.0);
        if !report.result.message().is_empty() {
            let _ = writeln!(out, "  {}", report.result.message());
        }
    } else {
        let _ = writeln!(out, "✗ Run failed: {}", report.result.message());
    }
    out.push('\n');

    // Scores
    out.push_str("Scores\n");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    let scores = &report.scores;
    let rows = [
        ("Single-core", scores.sub_scores.single_core, scores.fractions.single_core),
        ("Multi-core", scores.sub_scores.multi_core, scores.fractions.multi_core),
        ("Memory", scores.sub_scores.ram, scores.fractions.ram),
        ("GPU", scores.sub_scores.gpu, scores.fractions.gpu),
    ];
    for (name, value, fraction) in rows {
        let _ = writeln!(out, "  {:<12} {:>8}  {}", name, score(value), bar(fraction));
    }
    let _ = writeln!(out, "  {:<12} {:>8.0}", "Composite", scores.composite);
    out.push('\n');

    let bandwidths = [
        ("RAM", report.result.ram_bandwidth_gbs(), scores.fractions.ram_bandwidth),
        ("L1", report.result.l1_bandwidth_gbs(), scores.fractions.l1_bandwidth),
        ("L2", report.result.l2_bandwidth_gbs(), scores.fractions.l2_bandwidth),
    ];
    if bandwidths.iter().any(|(_, v, _)| v.is_some()) {
        out.push_str("Bandwidth\n");
        out.push_str(&"-".repeat(60));
        out.push('\n');
        for (name, value, fraction) in bandwidths {
            if let Some(value) = value {
                let _ = writeln!(out, "  {:<12} {:>6.1} GB/s  {}", name, value, bar(fraction));
            }
        }
        out.push('\n');
    }

    if report.histories.single_core_summary.count > 1
        || report.histories.multi_core_summary.count > 1
    {
        out.push_str("History\n");
        out.push_str(&"-".repeat(60));
        out.push('\n');
        history_line(&mut out, "Single-core", &report.histories.single_core_summary);
        history_line(&mut out, "Multi-core", &report.histories.multi_core_summary);
        out.push('\n');
    }

    // Thermal
    out.push_str("Thermal\n");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    let thermal = &report.thermal.summary;
    if thermal.samples == 0 {
        out.push_str("  no samples\n");
    } else {
        let _ = writeln!(
            out,
            "  start {:.1}°C  end {:.1}°C  delta {:+.1}°C  peak {:.1}°C  ({} samples over {:.1}s)",
            thermal.start_c,
            thermal.end_c,
            thermal.delta_c,
            thermal.peak_c,
            thermal.samples,
            thermal.duration_ms as f64 / 1000.0
        );
    }
    out.push('\n');

    match &report.gpu {
        GpuSection::Skipped => {}
        GpuSection::Completed { score } => {
            let _ = writeln!(out, "GPU test: completed, score {:.0}", score);
        }
        GpuSection::Aborted { reason } => {
            let _ = writeln!(out, "GPU test: aborted ({})", reason);
        }
    }

    out
}
