use thiserror::Error;

use super::steps::Step;
use super::types::{WorkflowInstance, WorkflowStage};
use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Employee not found: {employee_id}")]
    EmployeeNotFound { employee_id: String },

    #[error("Asset store failure at stage {stage}: {source}")]
    AssetStoreFailure {
        stage: WorkflowStage,
        #[source]
        source: StoreError,
    },

    #[error("Invalid state for step {step}: expected {expected}, found {actual}")]
    InvalidState {
        step: Step,
        expected: String,
        actual: String,
    },
}

/// A halted run: the error plus whatever state the run had reached.
///
/// `instance` is `None` when the run aborted before an instance existed
/// (employee lookup). Otherwise it holds the history up to the last
/// completed stage.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct WorkflowFailure {
    #[source]
    pub error: WorkflowError,
    pub instance: Option<Box<WorkflowInstance>>,
}

impl WorkflowFailure {
    pub fn before_start(error: WorkflowError) -> Self {
        Self {
            error,
            instance: None,
        }
    }

    pub fn at(error: WorkflowError, instance: WorkflowInstance) -> Self {
        Self {
            error,
            instance: Some(Box::new(instance)),
        }
    }

    pub fn instance(&self) -> Option<&WorkflowInstance> {
        self.instance.as_deref()
    }
}
