//! Validation metrics
//!
//! Counters only, monotonic, reset only on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters describing validator activity.
///
/// Uses Relaxed ordering; exact cross-counter consistency is not required.
#[derive(Debug, Default)]
pub struct ValidationMetrics {
    validations_run: AtomicU64,
    documents_rejected: AtomicU64,
    errors_reported: AtomicU64,
    lookups_issued: AtomicU64,
    lookup_failures: AtomicU64,
    config_warnings: AtomicU64,
}

impl ValidationMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one validation run
    pub fn increment_validations(&self) {
        self.validations_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected document carrying `errors` report entries
    pub fn record_rejection(&self, errors: u64) {
        self.documents_rejected.fetch_add(1, Ordering::Relaxed);
        self.errors_reported.fetch_add(errors, Ordering::Relaxed);
    }

    /// Record issued duplicate lookups
    pub fn add_lookups(&self, count: u64) {
        self.lookups_issued.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed duplicate lookup
    pub fn increment_lookup_failures(&self) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record configuration warnings
    pub fn add_config_warnings(&self, count: u64) {
        self.config_warnings.fetch_add(count, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            validations_run: self.validations_run.load(Ordering::Relaxed),
            documents_rejected: self.documents_rejected.load(Ordering::Relaxed),
            errors_reported: self.errors_reported.load(Ordering::Relaxed),
            lookups_issued: self.lookups_issued.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            config_warnings: self.config_warnings.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub validations_run: u64,
    pub documents_rejected: u64,
    pub errors_reported: u64,
    pub lookups_issued: u64,
    pub lookup_failures: u64,
    pub config_warnings: u64,
}
