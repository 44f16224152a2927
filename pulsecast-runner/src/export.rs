//! CSV export of rebound events and regeneration summaries.

use std::path::Path;

use anyhow::{Context, Result};
use pulsecast_core::ReboundEvent;

use crate::orchestrator::RegenerationSummary;

/// Export rebound events as CSV.
///
/// Columns: symbol, date, rebound_type, confidence, severity_score,
/// winning_pattern, patterns (`;`-separated pattern numbers)
pub fn export_rebounds_csv(events: &[ReboundEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "date",
        "rebound_type",
        "confidence",
        "severity_score",
        "winning_pattern",
        "patterns",
    ])?;

    for e in events {
        wtr.write_record([
            e.symbol.as_str(),
            e.date.to_string().as_str(),
            e.rebound_type.as_str(),
            format!("{:.2}", e.confidence).as_str(),
            format!("{:.2}", e.severity_score).as_str(),
            e.winning_pattern.map(|p| p.name()).unwrap_or(""),
            e.pattern_list().as_str(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a batch summary as CSV, one row per stock.
///
/// Columns: symbol, status, attempts, error. Successful rows leave
/// `attempts` and `error` empty.
pub fn export_summary_csv(summary: &RegenerationSummary) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["symbol", "status", "attempts", "error"])?;
    for symbol in &summary.succeeded {
        wtr.write_record([symbol.as_str(), "ok", "", ""])?;
    }
    for f in &summary.failed {
        wtr.write_record([
            f.symbol.as_str(),
            "failed",
            f.attempts.to_string().as_str(),
            f.error.as_str(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_rebounds_csv(events: &[ReboundEvent], path: &Path) -> Result<()> {
    let csv = export_rebounds_csv(events)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_summary_csv(summary: &RegenerationSummary, path: &Path) -> Result<()> {
    let csv = export_summary_csv(summary)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}
