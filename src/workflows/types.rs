// Workflow instance state - the value threaded through every step

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Asset, Employee};
use crate::telemetry::generate_correlation_id;

/// Stages a provisioning run moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Started,
    /// Reached in place of `Purchased` when a cash allowance is paid out
    CashProvided,
    Purchased,
    Assigned,
    Delivered,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Started => "started",
            WorkflowStage::CashProvided => "cash_provided",
            WorkflowStage::Purchased => "purchased",
            WorkflowStage::Assigned => "assigned",
            WorkflowStage::Delivered => "delivered",
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: WorkflowStage,
    pub timestamp: DateTime<Utc>,
}

/// Execution state of one provisioning run.
///
/// If `cash_provided` is set the instance never carries an asset. Otherwise
/// the asset is present from the end of the purchase step onward. The
/// history only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InstanceSnapshot")]
pub struct WorkflowInstance {
    id: String,
    employee: Employee,
    stage: WorkflowStage,
    cash_provided: bool,
    asset: Option<Asset>,
    history: Vec<StageRecord>,
}

/// Unchecked shape of a serialized instance
#[derive(Deserialize)]
struct InstanceSnapshot {
    id: String,
    employee: Employee,
    stage: WorkflowStage,
    cash_provided: bool,
    asset: Option<Asset>,
    history: Vec<StageRecord>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstanceSnapshotError {
    #[error("cash was provided but an asset is attached")]
    CashWithAsset,
    #[error("stage {stage} requires an asset")]
    MissingAsset { stage: WorkflowStage },
    #[error("stage {stage} does not match last recorded stage {recorded:?}")]
    StageMismatch {
        stage: WorkflowStage,
        recorded: Option<WorkflowStage>,
    },
}

impl TryFrom<InstanceSnapshot> for WorkflowInstance {
    type Error = InstanceSnapshotError;

    fn try_from(snapshot: InstanceSnapshot) -> Result<Self, Self::Error> {
        let recorded = snapshot.history.last().map(|record| record.stage);
        if recorded.unwrap_or(WorkflowStage::Started) != snapshot.stage {
            return Err(InstanceSnapshotError::StageMismatch {
                stage: snapshot.stage,
                recorded,
            });
        }

        let past_purchase = snapshot
            .history
            .iter()
            .any(|record| record.stage != WorkflowStage::Started);
        if snapshot.cash_provided && snapshot.asset.is_some() {
            return Err(InstanceSnapshotError::CashWithAsset);
        }
        if !snapshot.cash_provided && past_purchase && snapshot.asset.is_none() {
            return Err(InstanceSnapshotError::MissingAsset {
                stage: snapshot.stage,
            });
        }

        Ok(Self {
            id: snapshot.id,
            employee: snapshot.employee,
            stage: snapshot.stage,
            cash_provided: snapshot.cash_provided,
            asset: snapshot.asset,
            history: snapshot.history,
        })
    }
}

impl WorkflowInstance {
    pub fn new(employee: Employee) -> Self {
        Self {
            id: generate_correlation_id(),
            employee,
            stage: WorkflowStage::Started,
            cash_provided: false,
            asset: None,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn employee(&self) -> &Employee {
        &self.employee
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn cash_provided(&self) -> bool {
        self.cash_provided
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    /// Stages in the order they were recorded
    pub fn stage_trail(&self) -> Vec<WorkflowStage> {
        self.history.iter().map(|record| record.stage).collect()
    }

    /// Last stage appended to the history, `None` before the start step ran
    pub fn last_recorded(&self) -> Option<WorkflowStage> {
        self.history.last().map(|record| record.stage)
    }

    pub fn is_complete(&self) -> bool {
        self.last_recorded() == Some(WorkflowStage::Delivered)
    }

    pub fn to_audit_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn record_stage(&mut self, stage: WorkflowStage) {
        self.stage = stage;
        self.history.push(StageRecord {
            stage,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn mark_cash_provided(&mut self) {
        self.cash_provided = true;
        self.asset = None;
    }

    pub(crate) fn set_asset(&mut self, asset: Asset) {
        self.asset = Some(asset);
    }
}
