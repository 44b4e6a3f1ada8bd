//! CSV and JSON renderings of a report.

use thiserror::Error;

use crate::report::Report;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One header line plus one line per row, in report order. Unknown market
/// caps are empty cells.
pub fn to_csv(report: &Report) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &report.rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}

/// The full report, timestamp included, as pretty JSON.
pub fn to_json(report: &Report) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}
