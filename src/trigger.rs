// Trigger listener - starts a provisioning run when an employee record turns active

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::workflows::{WorkflowEngine, WorkflowFailure, WorkflowInstance};

/// Employee record state that qualifies for a run
pub const ACTIVE_STATE: &str = "active";

/// Employee record activation as delivered by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationEvent {
    pub employee_id: String,
    pub state: String,
}

impl ActivationEvent {
    pub fn active(employee_id: &str) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            state: ACTIVE_STATE.to_string(),
        }
    }

    pub fn qualifies(&self) -> bool {
        self.state == ACTIVE_STATE
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Completed(WorkflowInstance),
    /// Event did not meet the `state=active` filter
    Skipped { employee_id: String, state: String },
    Failed(WorkflowFailure),
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchOutcome::Completed(_))
    }
}

#[derive(Debug, Clone)]
pub struct TriggerListener {
    engine: Arc<WorkflowEngine>,
}

impl TriggerListener {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    /// Run the workflow for one event on the calling thread
    pub fn dispatch(&self, event: ActivationEvent) -> DispatchOutcome {
        if !event.qualifies() {
            debug!(
                employee_id = %event.employee_id,
                state = %event.state,
                "Ignoring employee record that is not active"
            );
            return DispatchOutcome::Skipped {
                employee_id: event.employee_id,
                state: event.state,
            };
        }

        info!(employee_id = %event.employee_id, "New employee hire triggered laptop workflow");
        match self.engine.run(&event.employee_id) {
            Ok(instance) => DispatchOutcome::Completed(instance),
            Err(failure) => DispatchOutcome::Failed(failure),
        }
    }

    /// Run one workflow per event, each on its own blocking task.
    ///
    /// Runs share nothing but the store. Outcomes come back in event order.
    pub async fn dispatch_batch(&self, events: Vec<ActivationEvent>) -> Result<Vec<DispatchOutcome>> {
        let handles: Vec<_> = events
            .into_iter()
            .map(|event| {
                let listener = self.clone();
                tokio::task::spawn_blocking(move || listener.dispatch(event))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await?);
        }

        let completed = outcomes.iter().filter(|o| o.is_completed()).count();
        info!(
            dispatched = outcomes.len(),
            completed = completed,
            "Activation batch finished"
        );
        Ok(outcomes)
    }
}
