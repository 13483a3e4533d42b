// In-memory asset store for local runs and tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use super::{
    Asset, AssetPatch, AssetStore, Employee, NewAsset, RecordKind, StoreError, StoreOperation,
};

#[derive(Debug, Default)]
struct Tables {
    employees: HashMap<String, Employee>,
    assets: HashMap<String, Asset>,
    failing: HashSet<StoreOperation>,
}

/// Thread-safe store backed by hash maps.
///
/// Operations can be made to fail with `inject_failure` to reproduce an
/// unavailable backend at a specific point of a run.
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    tables: Mutex<Tables>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees(employees: impl IntoIterator<Item = Employee>) -> Self {
        let store = Self::new();
        for employee in employees {
            store.add_employee(employee);
        }
        store
    }

    pub fn add_employee(&self, employee: Employee) {
        self.lock().employees.insert(employee.id.clone(), employee);
    }

    pub fn asset(&self, id: &str) -> Option<Asset> {
        self.lock().assets.get(id).cloned()
    }

    pub fn assets(&self) -> Vec<Asset> {
        self.lock().assets.values().cloned().collect()
    }

    pub fn asset_count(&self) -> usize {
        self.lock().assets.len()
    }

    /// Make every subsequent call of `operation` fail
    pub fn inject_failure(&self, operation: StoreOperation) {
        self.lock().failing.insert(operation);
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // Every mutation completes under the guard, so a poisoned lock is still consistent
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(tables: &Tables, operation: StoreOperation) -> Result<(), StoreError> {
        if tables.failing.contains(&operation) {
            return Err(StoreError::Unavailable {
                operation,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl AssetStore for InMemoryAssetStore {
    fn get_employee(&self, id: &str) -> Result<Employee, StoreError> {
        let tables = self.lock();
        Self::check_available(&tables, StoreOperation::GetEmployee)?;
        tables
            .employees
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: RecordKind::Employee,
                id: id.to_string(),
            })
    }

    fn create_asset(&self, spec: NewAsset) -> Result<Asset, StoreError> {
        let mut tables = self.lock();
        Self::check_available(&tables, StoreOperation::CreateAsset)?;
        let asset = Asset {
            id: Uuid::new_v4().to_string(),
            name: spec.name,
            tag: spec.tag,
            model: spec.model,
            status: spec.status,
            assigned_to: None,
        };
        debug!(asset_id = %asset.id, tag = %asset.tag, "Inserted asset record");
        tables.assets.insert(asset.id.clone(), asset.clone());
        Ok(asset)
    }

    fn update_asset(&self, id: &str, patch: AssetPatch) -> Result<Asset, StoreError> {
        let mut tables = self.lock();
        Self::check_available(&tables, StoreOperation::UpdateAsset)?;
        let asset = tables
            .assets
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                kind: RecordKind::Asset,
                id: id.to_string(),
            })?;
        if let Some(owner) = patch.assigned_to {
            asset.assigned_to = Some(owner);
        }
        if let Some(status) = patch.status {
            asset.status = status;
        }
        debug!(asset_id = %asset.id, status = %asset.status, "Updated asset record");
        Ok(asset.clone())
    }
}
