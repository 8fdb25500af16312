//! User-visible error reporting.
//!
//! The registry never surfaces failures through its return values when a
//! refresh runs in the background. Instead each failure is handed to an
//! [`ErrorReporter`] shared with the rest of the application. [`ErrorStore`]
//! is the bundled implementation: an observable list a UI can render.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::error::RefreshError;

/// Component name attached to reports raised by the adapter registry.
pub const ADAPTER_REGISTRY_SOURCE: &str = "adapter-registry";

/// One error worth showing to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Component that raised the error
    pub source: String,
    /// Human-readable message
    pub message: String,
    pub reported_at: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            reported_at: Utc::now(),
        }
    }

    pub(crate) fn from_refresh_error(error: &RefreshError) -> Self {
        Self::new(ADAPTER_REGISTRY_SOURCE, format!("Failed to load adapters: {error}"))
    }
}

/// Sink for user-visible errors, shared across the hosting application.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: ErrorReport);
}

/// Observable, append-only list of reported errors.
#[derive(Debug, Clone)]
pub struct ErrorStore {
    reports: Arc<watch::Sender<Vec<ErrorReport>>>,
}

impl Default for ErrorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorStore {
    pub fn new() -> Self {
        let (reports, _) = watch::channel(Vec::new());
        Self {
            reports: Arc::new(reports),
        }
    }

    /// All reports in arrival order.
    pub fn errors(&self) -> Vec<ErrorReport> {
        self.reports.borrow().clone()
    }

    pub fn latest(&self) -> Option<ErrorReport> {
        self.reports.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }

    /// Remove and return every report, e.g. once a UI has displayed them.
    pub fn take(&self) -> Vec<ErrorReport> {
        let mut drained = Vec::new();
        self.reports.send_if_modified(|reports| {
            drained = std::mem::take(reports);
            !drained.is_empty()
        });
        drained
    }

    /// Receive a notification whenever the list changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ErrorReport>> {
        self.reports.subscribe()
    }
}

impl ErrorReporter for ErrorStore {
    fn report(&self, report: ErrorReport) {
        self.reports.send_modify(|reports| reports.push(report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_types::PayloadError;

    #[test]
    fn reports_accumulate_in_order() {
        let store = ErrorStore::new();
        assert!(store.is_empty());

        store.report(ErrorReport::new("ui", "first"));
        store.report(ErrorReport::new("ui", "second"));

        let messages: Vec<String> = store.errors().into_iter().map(|report| report.message).collect();
        assert_eq!(messages, ["first", "second"]);
        assert_eq!(store.latest().map(|report| report.message).as_deref(), Some("second"));
    }

    #[test]
    fn take_drains_and_notifies_once() {
        let store = ErrorStore::new();
        let mut receiver = store.subscribe();
        store.report(ErrorReport::new("ui", "boom"));
        assert!(receiver.has_changed().expect("sender alive"));
        receiver.borrow_and_update();

        assert_eq!(store.take().len(), 1);
        assert!(store.is_empty());
        assert!(receiver.has_changed().expect("sender alive"));
        receiver.borrow_and_update();

        assert!(store.take().is_empty());
        assert!(!receiver.has_changed().expect("sender alive"));
    }

    #[test]
    fn refresh_errors_are_tagged_with_the_registry_source() {
        let report = ErrorReport::from_refresh_error(&RefreshError::Payload(PayloadError::Missing));
        assert_eq!(report.source, ADAPTER_REGISTRY_SOURCE);
        assert!(report.message.starts_with("Failed to load adapters:"), "message: {}", report.message);
        assert!(report.message.contains("no adapter payload"), "message: {}", report.message);
    }

    #[test]
    fn clones_share_the_same_list() {
        let store = ErrorStore::new();
        let shared = store.clone();
        shared.report(ErrorReport::new("ui", "shared"));
        assert_eq!(store.len(), 1);
    }
}
