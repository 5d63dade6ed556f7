//! Report Building
//!
//! Stamps a finished session with metadata and hands it to the report model.

use super::metadata::collect_system_info;
use super::session::SessionOutcome;
use performic_report::{Report, ReportMeta};
use performic_score::ReferenceScores;

/// Build a complete Report from a finished session
pub fn build_report(outcome: SessionOutcome, references: &ReferenceScores) -> Report {
    let run = outcome.run;
    let elapsed_ms = u64::try_from(run.elapsed.as_millis()).unwrap_or(u64::MAX);
    let meta = ReportMeta::new(run.session.as_u64(), elapsed_ms, collect_system_info());
    Report::new(meta, run.result, run.thermal, outcome.gpu, references)
}
