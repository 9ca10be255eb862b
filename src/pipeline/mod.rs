//! The analysis core: parse, encode, fit, report.
//!
//! Everything here is synchronous and batch-local. One call owns all of
//! its state (vocabulary, matrix, trees); nothing survives between
//! invocations, so concurrent callers never share a model.

pub mod event;
pub mod features;
pub mod forest;
pub mod report;

pub use event::EventRecord;
pub use features::{FeatureMatrix, Vocabulary};
pub use forest::Verdict;
pub use report::{Report, ReportStats, ScoredEvent};

use thiserror::Error;

use crate::config::AnalyzerConfig;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Input is not UTF-8, not JSON, or not a JSON array.
    #[error("invalid log format: {0}")]
    Format(String),
    /// A record field could not be projected into the feature space.
    #[error("feature encoding failed: {0}")]
    Encoding(String),
    /// Too few events to fit a partitioning ensemble over.
    #[error("insufficient data: need at least {need} events, have {have}")]
    InsufficientData { have: usize, need: usize },
}

/// Run the full pipeline over one uploaded log file.
pub fn analyze(raw: &[u8], config: &AnalyzerConfig) -> Result<Report, AnalyzeError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| AnalyzeError::Format(format!("input is not UTF-8: {e}")))?;

    let events = event::parse_events(text)?;
    tracing::info!(events = events.len(), "parsed event batch");
    if events.len() < 2 {
        return Err(AnalyzeError::InsufficientData {
            have: events.len(),
            need: 2,
        });
    }

    let vocab = Vocabulary::from_events(&events);
    let matrix = features::encode(&events, &vocab)?;
    tracing::debug!(
        rows = matrix.rows.len(),
        columns = matrix.columns,
        "encoded feature matrix"
    );

    let verdicts = forest::fit_score(&matrix, config.contamination, config.tree_count, config.seed)?;
    let report = report::build(events, &verdicts);
    tracing::info!(
        total = report.stats.total_events,
        anomalies = report.stats.anomaly_count,
        "analysis complete"
    );
    Ok(report)
}
