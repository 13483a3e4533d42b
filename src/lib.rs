// Laptop Workflow Library - new hire laptop provisioning
// Purchases, assigns and delivers a laptop for each newly active employee,
// or pays a cash allowance where laptops are not shipped.

pub mod config;
pub mod observability;
pub mod store;
pub mod telemetry;
pub mod trigger;
pub mod workflows;

// Re-export key types for easy access
pub use crate::config::{
    config, init_config, FlowConfig, ObservabilityConfig, ProvisioningConfig, WorkflowConfig,
};
pub use observability::{
    create_workflow_span, MeteredAssetStore, OperationTimer, WorkflowMetrics, WorkflowStats,
};
pub use store::{
    Asset, AssetPatch, AssetStatus, AssetStore, Employee, InMemoryAssetStore, NewAsset, RecordKind,
    StoreError, StoreOperation,
};
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use trigger::{ActivationEvent, DispatchOutcome, TriggerListener, ACTIVE_STATE};
pub use workflows::{
    FlowDefinition, Step, StageRecord, WorkflowEngine, WorkflowError, WorkflowFailure,
    WorkflowInstance, WorkflowStage,
};
