//! End-to-end tests for the laptop provisioning workflow
//!
//! These run the full four-stage flow against the in-memory asset store and
//! check the final instance, the audit trail and the records left in the store.

use std::sync::Arc;

use laptop_workflow::{
    AssetStatus, Employee, InMemoryAssetStore, Step, StoreOperation, WorkflowEngine,
    WorkflowError, WorkflowInstance, WorkflowStage,
};
use regex::Regex;

fn store_with(employees: &[(&str, &str, &str)]) -> Arc<InMemoryAssetStore> {
    Arc::new(InMemoryAssetStore::with_employees(
        employees
            .iter()
            .map(|(id, name, location)| Employee::new(id, name, location)),
    ))
}

#[test]
fn test_japan_contractor_receives_cash_instead_of_laptop() {
    let store = store_with(&[("u1", "Aya Tanaka", "Japan")]);
    let engine = WorkflowEngine::new(store.clone());

    let instance = engine.run("u1").unwrap();

    assert_eq!(instance.stage(), WorkflowStage::Delivered);
    assert!(instance.cash_provided());
    assert!(instance.asset().is_none());
    assert_eq!(store.asset_count(), 0);
    assert_eq!(
        instance.stage_trail(),
        vec![
            WorkflowStage::Started,
            WorkflowStage::CashProvided,
            WorkflowStage::Assigned,
            WorkflowStage::Delivered,
        ]
    );
}

#[test]
fn test_usa_employee_gets_delivered_laptop() {
    let store = store_with(&[("u2", "John Smith", "USA")]);
    let engine = WorkflowEngine::new(store.clone());

    let instance = engine.run("u2").unwrap();

    assert_eq!(instance.stage(), WorkflowStage::Delivered);
    assert!(!instance.cash_provided());

    let asset = instance.asset().expect("laptop should be carried on the instance");
    assert_eq!(asset.status, AssetStatus::Delivered);
    assert_eq!(asset.assigned_to.as_deref(), Some("u2"));
    assert_eq!(asset.name, "Laptop for John Smith");
    assert_eq!(asset.model, "Dell Latitude");
    assert!(Regex::new(r"^LP-[0-9a-f]{8}$").unwrap().is_match(&asset.tag));

    // The store holds the same record the instance reports
    assert_eq!(store.asset(&asset.id).as_ref(), Some(asset));
}

#[test]
fn test_every_location_outside_japan_gets_a_laptop() {
    let employees = [
        ("e1", "Ana Souza", "Brazil"),
        ("e2", "Lena Vogel", "Germany"),
        ("e3", "Priya Nair", "India"),
        ("e4", "Kenji Mori", "japan"),
        ("e5", "Sam Lee", ""),
    ];
    let store = store_with(&employees);
    let engine = WorkflowEngine::new(store.clone());

    for (id, _, _) in employees {
        let instance = engine.run(id).unwrap();
        let asset = instance.asset().unwrap();
        assert_eq!(asset.status, AssetStatus::Delivered);
        assert_eq!(asset.assigned_to.as_deref(), Some(id));
        assert_eq!(instance.history().len(), 4);
    }
    assert_eq!(store.asset_count(), employees.len());
}

#[test]
fn test_assign_failure_leaves_purchased_unowned_laptop() {
    let store = store_with(&[("u2", "John Smith", "USA")]);
    store.inject_failure(StoreOperation::UpdateAsset);
    let engine = WorkflowEngine::new(store.clone());

    let failure = engine.run("u2").unwrap_err();

    assert!(matches!(
        failure.error,
        WorkflowError::AssetStoreFailure { stage: WorkflowStage::Assigned, .. }
    ));
    let instance = failure.instance().expect("partial instance is preserved");
    assert_eq!(
        instance.stage_trail(),
        vec![WorkflowStage::Started, WorkflowStage::Purchased]
    );

    let assets = store.assets();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].status, AssetStatus::Purchased);
    assert_eq!(assets[0].assigned_to, None);
}

#[test]
fn test_deliver_failure_leaves_assigned_laptop_in_purchased_status() {
    let store = store_with(&[]);
    let engine = WorkflowEngine::new(store.clone());

    // Walk the steps by hand and break the store right before delivery
    let failure = {
        let instance = WorkflowInstance::new(Employee::new("u3", "Mary Jones", "Canada"));
        let instance = engine.advance(instance, Step::Start).unwrap();
        let instance = engine.advance(instance, Step::Purchase).unwrap();
        let instance = engine.advance(instance, Step::Assign).unwrap();
        store.inject_failure(StoreOperation::UpdateAsset);
        engine.advance(instance, Step::Deliver).unwrap_err()
    };

    let instance = failure.instance().unwrap();
    assert_eq!(instance.last_recorded(), Some(WorkflowStage::Assigned));
    let asset = store.asset(&instance.asset().unwrap().id).unwrap();
    assert_eq!(asset.status, AssetStatus::Purchased);
    assert_eq!(asset.assigned_to.as_deref(), Some("u3"));
}

#[test]
fn test_unknown_employee_is_reported_before_any_mutation() {
    let store = store_with(&[]);
    let engine = WorkflowEngine::new(store.clone());

    let failure = engine.run("nobody").unwrap_err();

    assert_eq!(
        failure.error,
        WorkflowError::EmployeeNotFound {
            employee_id: "nobody".to_string()
        }
    );
    assert!(failure.instance().is_none());
    assert_eq!(store.asset_count(), 0);
}

#[test]
fn test_second_delivery_is_rejected() {
    let store = store_with(&[("u2", "John Smith", "USA")]);
    let engine = WorkflowEngine::new(store.clone());
    let instance = engine.run("u2").unwrap();

    let failure = engine.advance(instance, Step::Deliver).unwrap_err();

    assert!(matches!(
        failure.error,
        WorkflowError::InvalidState { step: Step::Deliver, .. }
    ));
    let instance = failure.instance().unwrap();
    assert_eq!(instance.stage(), WorkflowStage::Delivered);
    assert_eq!(instance.asset().unwrap().status, AssetStatus::Delivered);
    assert_eq!(instance.history().len(), 4);
}

#[test]
fn test_audit_json_lists_history_in_order() {
    let store = store_with(&[("u1", "Aya Tanaka", "Japan")]);
    let instance = WorkflowEngine::new(store).run("u1").unwrap();

    let audit: serde_json::Value = serde_json::from_str(&instance.to_audit_json().unwrap()).unwrap();
    let stages: Vec<&str> = audit["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["stage"].as_str().unwrap())
        .collect();

    assert_eq!(stages, vec!["started", "cash_provided", "assigned", "delivered"]);
    assert_eq!(audit["cash_provided"], serde_json::Value::Bool(true));
    assert!(audit["asset"].is_null());
}
