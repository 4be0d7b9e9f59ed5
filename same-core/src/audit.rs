//! Audit trail for activations: every GPIO transition and every broadcast
//! assembled gets an immutable record, independent of the in-memory
//! `SignalLogger` (which is bounded and may roll entries off).

use chrono::{DateTime, Utc};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub category: &'static str,
    pub description: String,
}

/// Destination for audit records. A real deployment writes these to a
/// database or append-only log file; tests and the self-test harness use
/// `VecAuditSink` to assert on what was recorded.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Discards everything. Useful as a default when no audit persistence is
/// configured (e.g. the `decode` CLI subcommand, which is one-shot and has
/// nothing to audit against).
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _record: AuditRecord) {}
}

/// Collects records in memory, for tests and for the self-test harness's
/// end-of-run report.
#[derive(Default)]
pub struct VecAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl VecAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().expect("audit sink mutex poisoned").clone()
    }
}

impl AuditSink for VecAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().expect("audit sink mutex poisoned").push(record);
    }
}
