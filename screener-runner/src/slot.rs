//! The current-report slot: one writer at a time, many readers.
//!
//! Holds the last good report. A refresh replaces it with a single pointer
//! swap and only when the run produced rows, so readers see either the old
//! report or the new one, never a mix, and a failed run leaves the old one in
//! place.

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::report::{Report, RunOutcome};

#[derive(Debug, Default)]
pub struct ReportSlot {
    current: RwLock<Option<Arc<Report>>>,
    // Serializes refreshes; held for the whole run, not just the swap.
    refresh_lock: Mutex<()>,
}

impl ReportSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with a report restored from elsewhere (e.g. a snapshot file).
    pub fn with_report(report: Report) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(report))),
            refresh_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<Report>>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<Report>>> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The report currently held, if any.
    pub fn current(&self) -> Option<Arc<Report>> {
        self.read().clone()
    }

    /// When the held report was generated; `None` means "never".
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.read().as_ref().map(|r| r.generated_at)
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_none()
    }

    /// Install the outcome's report if it has one. Returns whether the slot changed.
    fn apply(&self, outcome: &RunOutcome) -> bool {
        match &outcome.report {
            Ok(report) => {
                *self.write() = Some(Arc::new(report.clone()));
                tracing::info!(rows = report.len(), "report replaced");
                true
            }
            Err(no_data) => {
                tracing::warn!(%no_data, "keeping previous report");
                false
            }
        }
    }

    /// Run `build` with refreshes serialized, then install its report on success.
    pub fn refresh<F>(&self, build: F) -> RunOutcome
    where
        F: FnOnce() -> RunOutcome,
    {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let outcome = build();
        self.apply(&outcome);
        outcome
    }

    /// First-load refresh: runs `build` only when the slot is still empty.
    ///
    /// Returns `None` when a report was already present (including one installed
    /// by a concurrent refresh while this call waited).
    pub fn ensure_loaded<F>(&self, build: F) -> Option<RunOutcome>
    where
        F: FnOnce() -> RunOutcome,
    {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.is_empty() {
            return None;
        }
        let outcome = build();
        self.apply(&outcome);
        Some(outcome)
    }
}
