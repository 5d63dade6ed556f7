//! Report Data Structures

use chrono::{DateTime, Utc};
use performic_payload::{BenchmarkResult, ThermalPoint};
use performic_score::{
    Fractions, HistorySummary, ReferenceScores, SubScores, ThermalSummary, summarize,
};
use serde::Serialize;

/// Report schema version, bumped on incompatible layout changes
pub const SCHEMA_VERSION: u32 = 1;

/// Complete report of one benchmark session
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub result: BenchmarkResult,
    pub histories: HistorySection,
    pub scores: ScoreSection,
    pub thermal: ThermalSection,
    pub gpu: GpuSection,
}

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub session: u64,
    pub elapsed_ms: u64,
    pub system: SystemInfo,
}

impl ReportMeta {
    /// Metadata stamped with the current time
    pub fn new(session: u64, elapsed_ms: u64, system: SystemInfo) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            session,
            elapsed_ms,
            system,
        }
    }
}

/// Host information
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
}

/// Per-iteration histories as displayed, with their summaries.
///
/// Series use the single-point fallback when the kernel reported a score
/// without a history. Summaries cover measured iterations only, so a
/// fallback series has a summary with `count == 0`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistorySection {
    pub single_core: Vec<f64>,
    pub multi_core: Vec<f64>,
    pub single_core_summary: HistorySummary,
    pub multi_core_summary: HistorySummary,
}

/// Sub-scores, composite and progress fractions
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSection {
    pub sub_scores: SubScores,
    pub composite: f64,
    pub fractions: Fractions,
}

/// Thermal series and its summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThermalSection {
    pub summary: ThermalSummary,
    pub points: Vec<ThermalPoint>,
}

/// GPU session outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GpuSection {
    /// No GPU test was run
    #[default]
    Skipped,
    /// GPU kernel produced a score
    Completed { score: f64 },
    /// GPU session ended without a score
    Aborted { reason: String },
}

impl GpuSection {
    /// Score, when the GPU test completed
    pub fn score(&self) -> Option<f64> {
        match self {
            GpuSection::Completed { score } => Some(*score),
            _ => None,
        }
    }
}

impl Report {
    /// Assemble a report from a finished run
    pub fn new(
        meta: ReportMeta,
        result: BenchmarkResult,
        thermal: Vec<ThermalPoint>,
        gpu: GpuSection,
        references: &ReferenceScores,
    ) -> Self {
        let sub_scores = SubScores::from_result(&result, gpu.score());
        let scores = ScoreSection {
            composite: sub_scores.composite(),
            fractions: references.fractions(&sub_scores, &result),
            sub_scores,
        };

        let histories = HistorySection {
            single_core_summary: summarize(result.single_core_history()),
            multi_core_summary: summarize(result.multi_core_history()),
            single_core: result.single_core_series(),
            multi_core: result.multi_core_series(),
        };

        Self {
            meta,
            result,
            histories,
            scores,
            thermal: ThermalSection {
                summary: ThermalSummary::from_points(&thermal),
                points: thermal,
            },
            gpu,
        }
    }

    /// Whether the CPU/memory run succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}
