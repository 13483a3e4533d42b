// Asset store client - typed access to employee and asset records
//
// The record store itself lives outside this crate. Everything the workflow
// needs from it goes through the `AssetStore` trait so it can be swapped for
// the in-memory store or a mock in tests.

pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

pub use memory::InMemoryAssetStore;

/// Employee record as read from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    /// Country name, e.g. "Japan"
    pub location: String,
}

impl Employee {
    pub fn new(id: &str, name: &str, location: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            location: location.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    Purchased,
    Assigned,
    Delivered,
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AssetStatus::Purchased => "Purchased",
            AssetStatus::Assigned => "Assigned",
            AssetStatus::Delivered => "Delivered",
        };
        write!(f, "{label}")
    }
}

/// Laptop asset record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub tag: String,
    pub model: String,
    pub status: AssetStatus,
    pub assigned_to: Option<String>,
}

/// Fields for a new asset record. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsset {
    pub name: String,
    pub tag: String,
    pub model: String,
    pub status: AssetStatus,
}

/// Partial update of an asset. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPatch {
    pub assigned_to: Option<String>,
    pub status: Option<AssetStatus>,
}

impl AssetPatch {
    pub fn assign_to(employee_id: &str) -> Self {
        Self {
            assigned_to: Some(employee_id.to_string()),
            ..Default::default()
        }
    }

    pub fn status(status: AssetStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Employee,
    Asset,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Employee => write!(f, "employee"),
            RecordKind::Asset => write!(f, "asset"),
        }
    }
}

/// The store operations, used for fault injection and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreOperation {
    GetEmployee,
    CreateAsset,
    UpdateAsset,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOperation::GetEmployee => write!(f, "get_employee"),
            StoreOperation::CreateAsset => write!(f, "create_asset"),
            StoreOperation::UpdateAsset => write!(f, "update_asset"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} record not found: {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("Asset store unavailable during {operation}: {reason}")]
    Unavailable {
        operation: StoreOperation,
        reason: String,
    },
}

/// Synchronous CRUD interface over the employee and asset tables.
///
/// Implementations provide their own consistency for concurrent writes.
/// Callers never retry; a failed call is reported as-is.
#[cfg_attr(test, automock)]
pub trait AssetStore: Send + Sync {
    /// Look up an employee by id
    fn get_employee(&self, id: &str) -> Result<Employee, StoreError>;

    /// Insert a new asset record and return it with its assigned id
    fn create_asset(&self, spec: NewAsset) -> Result<Asset, StoreError>;

    /// Apply a patch to an existing asset and return the updated record
    fn update_asset(&self, id: &str, patch: AssetPatch) -> Result<Asset, StoreError>;
}
