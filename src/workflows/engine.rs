// Workflow engine - runs the ordered step list for one employee

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::errors::{WorkflowError, WorkflowFailure};
use super::steps::Step;
use super::types::{WorkflowInstance, WorkflowStage};
use crate::config::{FlowConfig, ProvisioningConfig, WorkflowConfig};
use crate::observability::{
    create_workflow_span, MeteredAssetStore, OperationTimer, WorkflowMetrics,
};
use crate::store::{AssetStore, Employee, StoreError};

/// Name, version and ordered steps of the flow being run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub name: String,
    pub description: String,
    pub version: String,
    steps: Vec<Step>,
}

impl FlowDefinition {
    pub fn laptop_provisioning(flow: &FlowConfig) -> Self {
        Self {
            name: flow.name.clone(),
            description: flow.description.clone(),
            version: flow.version.clone(),
            steps: Step::SEQUENCE.to_vec(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl Default for FlowDefinition {
    fn default() -> Self {
        Self::laptop_provisioning(&FlowConfig::default())
    }
}

pub struct WorkflowEngine {
    store: Arc<dyn AssetStore>,
    flow: FlowDefinition,
    provisioning: ProvisioningConfig,
    metrics: Arc<WorkflowMetrics>,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("flow", &self.flow)
            .field("provisioning", &self.provisioning)
            .field("metrics", &self.metrics.get_stats())
            .finish()
    }
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self {
            store,
            flow: FlowDefinition::default(),
            provisioning: ProvisioningConfig::default(),
            metrics: Arc::new(WorkflowMetrics::new()),
        }
    }

    pub fn with_config(mut self, config: &WorkflowConfig) -> Self {
        self.flow = FlowDefinition::laptop_provisioning(&config.flow);
        self.provisioning = config.provisioning.clone();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<WorkflowMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn flow(&self) -> &FlowDefinition {
        &self.flow
    }

    pub fn metrics(&self) -> &WorkflowMetrics {
        &self.metrics
    }

    /// Run the whole flow for one employee.
    ///
    /// Stops at the first failing step. Completed stages are not rolled back
    /// and nothing is retried.
    pub fn run(&self, employee_id: &str) -> Result<WorkflowInstance, WorkflowFailure> {
        let timer = OperationTimer::new("laptop_workflow_run");
        self.metrics.record_run_started();

        let employee = match self.fetch_employee(employee_id) {
            Ok(employee) => employee,
            Err(error) => {
                self.metrics.record_run_failed();
                error!(employee_id = %employee_id, error = %error, "Workflow aborted before purchase");
                timer.finish();
                return Err(WorkflowFailure::before_start(error));
            }
        };

        let mut instance = WorkflowInstance::new(employee);
        let span = create_workflow_span(&self.flow.name, instance.id(), employee_id);
        let _guard = span.enter();

        info!(
            flow = %self.flow.name,
            version = %self.flow.version,
            steps = self.flow.steps().len(),
            "Running workflow"
        );

        for step in self.flow.steps() {
            instance = match self.execute_step(*step, instance) {
                Ok(instance) => instance,
                Err(failure) => {
                    self.metrics.record_run_failed();
                    timer.finish();
                    return Err(failure);
                }
            };
        }

        self.metrics.record_run_completed(instance.cash_provided());
        timer.finish();
        Ok(instance)
    }

    /// Execute a single step against an existing instance
    pub fn advance(
        &self,
        instance: WorkflowInstance,
        step: Step,
    ) -> Result<WorkflowInstance, WorkflowFailure> {
        self.execute_step(step, instance)
    }

    fn execute_step(
        &self,
        step: Step,
        instance: WorkflowInstance,
    ) -> Result<WorkflowInstance, WorkflowFailure> {
        let from = instance.last_recorded();
        let store = MeteredAssetStore::new(self.store.as_ref(), &self.metrics);
        let result = step.execute(instance, &store, &self.provisioning);

        if let Err(failure) = &result {
            warn!(
                step = %step,
                from = ?from,
                error = %failure.error,
                "Workflow halted"
            );
        }
        result
    }

    fn fetch_employee(&self, employee_id: &str) -> Result<Employee, WorkflowError> {
        let store = MeteredAssetStore::new(self.store.as_ref(), &self.metrics);
        store
            .get_employee(employee_id)
            .map_err(|source| match source {
                StoreError::NotFound { .. } => WorkflowError::EmployeeNotFound {
                    employee_id: employee_id.to_string(),
                },
                other => WorkflowError::AssetStoreFailure {
                    stage: WorkflowStage::Started,
                    source: other,
                },
            })
    }
}
