// Laptop provisioning workflow
// Start -> Purchase (or cash allowance) -> Assign -> Deliver

pub mod engine;
pub mod errors;
pub mod steps;
pub mod types;

pub use engine::{FlowDefinition, WorkflowEngine};
pub use errors::{WorkflowError, WorkflowFailure};
pub use steps::{generate_asset_tag, Step};
pub use types::{InstanceSnapshotError, StageRecord, WorkflowInstance, WorkflowStage};
