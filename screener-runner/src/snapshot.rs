//! Last-good-report persistence as a JSON file.
//!
//! Lets the last successful report (and its timestamp) outlive the process.
//! Writes go to a sibling temp file that is then renamed over the target, so
//! a reader never sees a half-written snapshot.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::Report;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt snapshot at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("refusing to store an empty report")]
    EmptyReport,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Load the stored report. `Ok(None)` when no snapshot has been written yet.
    pub fn load(&self) -> Result<Option<Report>, SnapshotError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };

        let report = serde_json::from_str(&json).map_err(|source| SnapshotError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(report))
    }

    /// Replace the stored report. Empty reports are rejected so a failed run can
    /// never blank out the last good one.
    pub fn store(&self, report: &Report) -> Result<(), SnapshotError> {
        if report.is_empty() {
            return Err(SnapshotError::EmptyReport);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let json = serde_json::to_string_pretty(report).map_err(|source| {
            SnapshotError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            self.io_err(e)
        })?;

        tracing::debug!(path = %self.path.display(), rows = report.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use screener_core::domain::IndicatorRow;

    fn report() -> Report {
        let row = IndicatorRow {
            symbol: "SPY".into(),
            as_of: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            current_price: 530.25,
            market_cap: None,
            week52_low: 410.0,
            week52_high: 540.0,
            pct_from_52w_low: 29.33,
            pct_from_52w_high: -1.8,
            sma20: 525.0,
            std20: 4.0,
            bb_low: 517.0,
            bb_high: 533.0,
            pct_from_bb_low: 2.56,
            pct_from_bb_high: -0.52,
        };
        Report::new(vec![row], Utc.with_ymd_and_hms(2024, 6, 3, 20, 0, 0).unwrap())
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("report.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested/report.json"));
        store.store(&report()).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, report());
        assert!(!dir.path().join("nested/report.json.tmp").exists());
    }

    #[test]
    fn empty_report_is_rejected_and_old_snapshot_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("report.json"));
        store.store(&report()).unwrap();

        let empty = Report::new(vec![], Utc::now());
        assert!(matches!(store.store(&empty), Err(SnapshotError::EmptyReport)));
        assert_eq!(store.load().unwrap().unwrap(), report());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = SnapshotStore::new(&path).load().unwrap_err();
        assert!(matches!(err, SnapshotError::Corrupt { .. }));
    }
}
