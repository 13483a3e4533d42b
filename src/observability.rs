use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{info, warn};

use crate::store::{Asset, AssetPatch, AssetStore, Employee, NewAsset, StoreError};

/// Workflow run and asset store counters
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub runs_started: AtomicU64,
    pub runs_completed: AtomicU64,
    pub runs_failed: AtomicU64,
    pub cash_allowances: AtomicU64,
    pub store_calls: AtomicU64,
    pub store_failures: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_completed(&self, cash_provided: bool) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        if cash_provided {
            self.cash_allowances.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_run_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_call(&self) {
        self.store_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
        warn!("Asset store call failed");
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            cash_allowances: self.cash_allowances.load(Ordering::Relaxed),
            store_calls: self.store_calls.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Workflow metrics: started={}, completed={}, failed={}, cash_allowances={}, store_calls={}, store_failures={}",
            stats.runs_started,
            stats.runs_completed,
            stats.runs_failed,
            stats.cash_allowances,
            stats.store_calls,
            stats.store_failures
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStats {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub cash_allowances: u64,
    pub store_calls: u64,
    pub store_failures: u64,
}

/// Asset store wrapper that counts calls and failures
pub struct MeteredAssetStore<'a> {
    inner: &'a dyn AssetStore,
    metrics: &'a WorkflowMetrics,
}

impl<'a> MeteredAssetStore<'a> {
    pub fn new(inner: &'a dyn AssetStore, metrics: &'a WorkflowMetrics) -> Self {
        Self { inner, metrics }
    }

    fn observe<T>(&self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        self.metrics.record_store_call();
        if result.is_err() {
            self.metrics.record_store_failure();
        }
        result
    }
}

impl AssetStore for MeteredAssetStore<'_> {
    fn get_employee(&self, id: &str) -> Result<Employee, StoreError> {
        self.observe(self.inner.get_employee(id))
    }

    fn create_asset(&self, spec: NewAsset) -> Result<Asset, StoreError> {
        self.observe(self.inner.create_asset(spec))
    }

    fn update_asset(&self, id: &str, patch: AssetPatch) -> Result<Asset, StoreError> {
        self.observe(self.inner.update_asset(id, patch))
    }
}

/// Span covering one provisioning run
pub fn create_workflow_span(workflow: &str, instance_id: &str, employee_id: &str) -> tracing::Span {
    tracing::info_span!(
        "workflow",
        workflow.name = workflow,
        instance.id = instance_id,
        employee.id = employee_id
    )
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
