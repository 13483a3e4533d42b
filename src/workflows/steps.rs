// Provisioning steps - one variant per stage of the laptop flow
//
// Each step takes the instance by value and hands it back, either advanced
// or untouched inside the failure. The asset store is the only side effect.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::errors::{WorkflowError, WorkflowFailure};
use super::types::{WorkflowInstance, WorkflowStage};
use crate::config::ProvisioningConfig;
use crate::store::{AssetPatch, AssetStatus, AssetStore, NewAsset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Start,
    Purchase,
    Assign,
    Deliver,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Step {
    /// The fixed order of the laptop flow
    pub const SEQUENCE: [Step; 4] = [Step::Start, Step::Purchase, Step::Assign, Step::Deliver];

    pub fn name(&self) -> &'static str {
        match self {
            Step::Start => "Start the flow",
            Step::Purchase => "Purchase Laptop",
            Step::Assign => "Assign Laptop",
            Step::Deliver => "Deliver Laptop",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Step::Start => {
                "Start the flow to purchase, assign, and deliver a new laptop to a new employee"
            }
            Step::Purchase => "Purchase a new laptop for the employee",
            Step::Assign => "Assign the purchased laptop to the employee",
            Step::Deliver => "Deliver the assigned laptop to the employee",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Step::Start => "1.0.0",
            Step::Purchase | Step::Assign | Step::Deliver => "1.1.0",
        }
    }

    /// Stages this step may follow. An empty slice means the history must be empty.
    pub fn predecessors(&self) -> &'static [WorkflowStage] {
        match self {
            Step::Start => &[],
            Step::Purchase => &[WorkflowStage::Started],
            Step::Assign => &[WorkflowStage::Purchased, WorkflowStage::CashProvided],
            Step::Deliver => &[WorkflowStage::Assigned],
        }
    }

    pub fn execute(
        &self,
        instance: WorkflowInstance,
        store: &dyn AssetStore,
        provisioning: &ProvisioningConfig,
    ) -> Result<WorkflowInstance, WorkflowFailure> {
        if let Err(error) = self.check_predecessor(&instance) {
            return Err(WorkflowFailure::at(error, instance));
        }

        match self {
            Step::Start => Ok(start(instance)),
            Step::Purchase => purchase(instance, store, provisioning),
            Step::Assign => assign(instance, store),
            Step::Deliver => deliver(instance, store),
        }
    }

    fn check_predecessor(&self, instance: &WorkflowInstance) -> Result<(), WorkflowError> {
        let last = instance.last_recorded();
        let allowed = match last {
            None => self.predecessors().is_empty(),
            Some(stage) => self.predecessors().contains(&stage),
        };
        if allowed {
            return Ok(());
        }

        let expected = if self.predecessors().is_empty() {
            "no prior stage".to_string()
        } else {
            self.predecessors()
                .iter()
                .map(WorkflowStage::as_str)
                .collect::<Vec<_>>()
                .join(" or ")
        };
        Err(WorkflowError::InvalidState {
            step: *self,
            expected,
            actual: last.map_or("no prior stage", |stage| stage.as_str()).to_string(),
        })
    }
}

/// `<prefix><length lowercase hex digits>`, e.g. `LP-3fa91c0e`
pub fn generate_asset_tag(prefix: &str, length: usize) -> String {
    let mut rng = rand::rng();
    let digits: String = (0..length)
        .map(|_| format!("{:x}", rng.random_range(0..16u8)))
        .collect();
    format!("{prefix}{digits}")
}

fn start(mut instance: WorkflowInstance) -> WorkflowInstance {
    instance.record_stage(WorkflowStage::Started);
    info!(
        instance_id = %instance.id(),
        employee_id = %instance.employee().id,
        stage = %WorkflowStage::Started,
        "Flow has been started for employee {}. State: {}",
        instance.employee().name,
        WorkflowStage::Started
    );
    instance
}

fn purchase(
    mut instance: WorkflowInstance,
    store: &dyn AssetStore,
    provisioning: &ProvisioningConfig,
) -> Result<WorkflowInstance, WorkflowFailure> {
    if instance.employee().location == provisioning.cash_allowance_country {
        instance.mark_cash_provided();
        instance.record_stage(WorkflowStage::CashProvided);
        info!(
            instance_id = %instance.id(),
            employee_id = %instance.employee().id,
            stage = %WorkflowStage::CashProvided,
            "Cash has been provided to employee {} in {} to purchase their own laptop. State: {}",
            instance.employee().name,
            provisioning.cash_allowance_country,
            WorkflowStage::CashProvided
        );
        return Ok(instance);
    }

    let spec = NewAsset {
        name: format!("Laptop for {}", instance.employee().name),
        tag: generate_asset_tag(&provisioning.asset_tag_prefix, provisioning.asset_tag_length),
        model: provisioning.laptop_model.clone(),
        status: AssetStatus::Purchased,
    };

    match store.create_asset(spec) {
        Ok(asset) => {
            instance.set_asset(asset);
            instance.record_stage(WorkflowStage::Purchased);
            info!(
                instance_id = %instance.id(),
                employee_id = %instance.employee().id,
                asset_tag = ?instance.asset().map(|asset| asset.tag.as_str()),
                stage = %WorkflowStage::Purchased,
                "Laptop has been purchased for employee {}. State: {}",
                instance.employee().name,
                WorkflowStage::Purchased
            );
            Ok(instance)
        }
        Err(source) => Err(store_failure(WorkflowStage::Purchased, source, instance)),
    }
}

/// Cash instances still move to `assigned` (and later `delivered`) and log that stage, not `cash_provided`.
fn assign(
    mut instance: WorkflowInstance,
    store: &dyn AssetStore,
) -> Result<WorkflowInstance, WorkflowFailure> {
    if instance.cash_provided() {
        instance.record_stage(WorkflowStage::Assigned);
        info!(
            instance_id = %instance.id(),
            employee_id = %instance.employee().id,
            stage = %WorkflowStage::Assigned,
            "Laptop has not been assigned as employee {} has been provided with cash to purchase their own laptop. State: {}",
            instance.employee().name,
            WorkflowStage::Assigned
        );
        return Ok(instance);
    }

    let asset_id = match required_asset_id(&instance, Step::Assign) {
        Ok(id) => id,
        Err(error) => return Err(WorkflowFailure::at(error, instance)),
    };

    let patch = AssetPatch::assign_to(&instance.employee().id);
    match store.update_asset(&asset_id, patch) {
        Ok(asset) => {
            instance.set_asset(asset);
            instance.record_stage(WorkflowStage::Assigned);
            info!(
                instance_id = %instance.id(),
                employee_id = %instance.employee().id,
                asset_id = %asset_id,
                stage = %WorkflowStage::Assigned,
                "Laptop has been assigned to employee {}. State: {}",
                instance.employee().name,
                WorkflowStage::Assigned
            );
            Ok(instance)
        }
        Err(source) => Err(store_failure(WorkflowStage::Assigned, source, instance)),
    }
}

fn deliver(
    mut instance: WorkflowInstance,
    store: &dyn AssetStore,
) -> Result<WorkflowInstance, WorkflowFailure> {
    if instance.cash_provided() {
        instance.record_stage(WorkflowStage::Delivered);
        info!(
            instance_id = %instance.id(),
            employee_id = %instance.employee().id,
            stage = %WorkflowStage::Delivered,
            "Laptop has not been delivered as employee {} has been provided with cash to purchase their own laptop. State: {}",
            instance.employee().name,
            WorkflowStage::Delivered
        );
        return Ok(instance);
    }

    let asset_id = match required_asset_id(&instance, Step::Deliver) {
        Ok(id) => id,
        Err(error) => return Err(WorkflowFailure::at(error, instance)),
    };

    match store.update_asset(&asset_id, AssetPatch::status(AssetStatus::Delivered)) {
        Ok(asset) => {
            instance.set_asset(asset);
            instance.record_stage(WorkflowStage::Delivered);
            info!(
                instance_id = %instance.id(),
                employee_id = %instance.employee().id,
                asset_id = %asset_id,
                stage = %WorkflowStage::Delivered,
                "Laptop has been delivered to employee {}. State: {}",
                instance.employee().name,
                WorkflowStage::Delivered
            );
            Ok(instance)
        }
        Err(source) => Err(store_failure(WorkflowStage::Delivered, source, instance)),
    }
}

// Without a cash allowance the purchase step always leaves an asset behind
fn required_asset_id(instance: &WorkflowInstance, step: Step) -> Result<String, WorkflowError> {
    instance
        .asset()
        .map(|asset| asset.id.clone())
        .ok_or_else(|| WorkflowError::InvalidState {
            step,
            expected: "an asset from the purchase step".to_string(),
            actual: "no asset".to_string(),
        })
}

fn store_failure(
    stage: WorkflowStage,
    source: crate::store::StoreError,
    instance: WorkflowInstance,
) -> WorkflowFailure {
    WorkflowFailure::at(WorkflowError::AssetStoreFailure { stage, source }, instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Asset, Employee, MockAssetStore, StoreError, StoreOperation};
    use mockall::predicate::eq;

    fn provisioning() -> ProvisioningConfig {
        ProvisioningConfig::default()
    }

    fn purchased_asset() -> Asset {
        Asset {
            id: "asset-1".to_string(),
            name: "Laptop for John Smith".to_string(),
            tag: "LP-00ff00ff".to_string(),
            model: "Dell Latitude".to_string(),
            status: AssetStatus::Purchased,
            assigned_to: None,
        }
    }

    fn started(employee: Employee) -> WorkflowInstance {
        let store = MockAssetStore::new();
        Step::Start
            .execute(WorkflowInstance::new(employee), &store, &provisioning())
            .unwrap()
    }

    #[test]
    fn test_generate_asset_tag_shape() {
        let tag = generate_asset_tag("LP-", 8);
        assert_eq!(tag.len(), 11);
        assert!(tag.starts_with("LP-"));
        assert!(tag[3..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_purchase_creates_laptop_outside_cash_country() {
        let mut store = MockAssetStore::new();
        store
            .expect_create_asset()
            .withf(|spec: &NewAsset| {
                spec.name == "Laptop for John Smith"
                    && spec.model == "Dell Latitude"
                    && spec.status == AssetStatus::Purchased
                    && spec.tag.starts_with("LP-")
            })
            .times(1)
            .returning(|_| Ok(purchased_asset()));

        let instance = started(Employee::new("u2", "John Smith", "USA"));
        let instance = Step::Purchase
            .execute(instance, &store, &provisioning())
            .unwrap();

        assert_eq!(instance.stage(), WorkflowStage::Purchased);
        assert!(!instance.cash_provided());
        assert_eq!(instance.asset().map(|a| a.id.as_str()), Some("asset-1"));
    }

    #[test]
    fn test_purchase_pays_cash_in_japan_without_store_calls() {
        let mut store = MockAssetStore::new();
        store.expect_create_asset().never();

        let instance = started(Employee::new("u1", "Aya Tanaka", "Japan"));
        let instance = Step::Purchase
            .execute(instance, &store, &provisioning())
            .unwrap();

        assert_eq!(instance.stage(), WorkflowStage::CashProvided);
        assert!(instance.cash_provided());
        assert!(instance.asset().is_none());
    }

    #[test]
    fn test_cash_country_is_configurable() {
        let mut store = MockAssetStore::new();
        store.expect_create_asset().never();
        let provisioning = ProvisioningConfig {
            cash_allowance_country: "Korea".to_string(),
            ..ProvisioningConfig::default()
        };

        let instance = started(Employee::new("u9", "Min Park", "Korea"));
        let instance = Step::Purchase.execute(instance, &store, &provisioning).unwrap();
        assert!(instance.cash_provided());
    }

    #[test]
    fn test_assign_patches_owner_only() {
        let mut store = MockAssetStore::new();
        store
            .expect_create_asset()
            .returning(|_| Ok(purchased_asset()));
        store
            .expect_update_asset()
            .with(eq("asset-1"), eq(AssetPatch::assign_to("u2")))
            .times(1)
            .returning(|_, _| {
                Ok(Asset {
                    assigned_to: Some("u2".to_string()),
                    ..purchased_asset()
                })
            });

        let instance = started(Employee::new("u2", "John Smith", "USA"));
        let instance = Step::Purchase.execute(instance, &store, &provisioning()).unwrap();
        let instance = Step::Assign.execute(instance, &store, &provisioning()).unwrap();

        let asset = instance.asset().unwrap();
        assert_eq!(asset.assigned_to.as_deref(), Some("u2"));
        assert_eq!(asset.status, AssetStatus::Purchased);
        assert_eq!(instance.stage(), WorkflowStage::Assigned);
    }

    #[test]
    fn test_assign_failure_keeps_history_and_returns_instance() {
        let mut store = MockAssetStore::new();
        store
            .expect_create_asset()
            .returning(|_| Ok(purchased_asset()));
        store.expect_update_asset().returning(|_, _| {
            Err(StoreError::Unavailable {
                operation: StoreOperation::UpdateAsset,
                reason: "timeout".to_string(),
            })
        });

        let instance = started(Employee::new("u2", "John Smith", "USA"));
        let instance = Step::Purchase.execute(instance, &store, &provisioning()).unwrap();
        let failure = Step::Assign
            .execute(instance, &store, &provisioning())
            .unwrap_err();

        assert!(matches!(
            failure.error,
            WorkflowError::AssetStoreFailure { stage: WorkflowStage::Assigned, .. }
        ));
        let instance = failure.instance().unwrap();
        assert_eq!(
            instance.stage_trail(),
            vec![WorkflowStage::Started, WorkflowStage::Purchased]
        );
        assert_eq!(instance.asset().unwrap().assigned_to, None);
    }

    #[test]
    fn test_steps_out_of_order_are_invalid_state() {
        let store = MockAssetStore::new();
        let instance = started(Employee::new("u2", "John Smith", "USA"));

        let failure = Step::Deliver
            .execute(instance, &store, &provisioning())
            .unwrap_err();
        match &failure.error {
            WorkflowError::InvalidState { step, expected, actual } => {
                assert_eq!(*step, Step::Deliver);
                assert_eq!(expected, "assigned");
                assert_eq!(actual, "started");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Untouched instance comes back with the failure
        assert_eq!(failure.instance().unwrap().stage_trail(), vec![WorkflowStage::Started]);
    }

    #[test]
    fn test_start_twice_is_invalid_state() {
        let store = MockAssetStore::new();
        let instance = started(Employee::new("u2", "John Smith", "USA"));
        let failure = Step::Start
            .execute(instance, &store, &provisioning())
            .unwrap_err();
        assert!(matches!(
            failure.error,
            WorkflowError::InvalidState { step: Step::Start, .. }
        ));
    }

    #[test]
    fn test_step_metadata_matches_flow_definition() {
        assert_eq!(Step::SEQUENCE[0].name(), "Start the flow");
        assert_eq!(Step::Start.version(), "1.0.0");
        assert_eq!(Step::Deliver.version(), "1.1.0");
        assert_eq!(
            Step::Assign.description(),
            "Assign the purchased laptop to the employee"
        );
    }
}
