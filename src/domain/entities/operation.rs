use super::customer::{Customer, CustomerPatch};
use crate::domain::value_objects::{Collection, OperationId, OperationKind, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The mutation an operation carries, one variant per (collection, kind) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationPayload {
    CreateCustomer { customer: Customer },
    UpdateCustomer { id: RecordId, patch: CustomerPatch },
    DeleteCustomer { id: RecordId },
}

impl OperationPayload {
    pub fn collection(&self) -> Collection {
        match self {
            OperationPayload::CreateCustomer { .. }
            | OperationPayload::UpdateCustomer { .. }
            | OperationPayload::DeleteCustomer { .. } => Collection::Customers,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            OperationPayload::CreateCustomer { .. } => OperationKind::Create,
            OperationPayload::UpdateCustomer { .. } => OperationKind::Update,
            OperationPayload::DeleteCustomer { .. } => OperationKind::Delete,
        }
    }

    /// Identity of the record the operation targets.
    pub fn record_id(&self) -> &RecordId {
        match self {
            OperationPayload::CreateCustomer { customer } => &customer.id,
            OperationPayload::UpdateCustomer { id, .. } => id,
            OperationPayload::DeleteCustomer { id } => id,
        }
    }

    /// Points the payload at a server-assigned id.
    pub fn retarget(&mut self, new_id: RecordId) {
        match self {
            OperationPayload::CreateCustomer { customer } => customer.id = new_id,
            OperationPayload::UpdateCustomer { id, .. } => *id = new_id,
            OperationPayload::DeleteCustomer { id } => *id = new_id,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            OperationPayload::CreateCustomer { customer } => {
                if customer.name.trim().is_empty() || customer.mobile.trim().is_empty() {
                    return Err("Customer name and mobile are required".to_string());
                }
                Ok(())
            }
            OperationPayload::UpdateCustomer { patch, .. } => patch.validate(),
            OperationPayload::DeleteCustomer { .. } => Ok(()),
        }
    }
}

/// One durable entry of the operation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    pub id: OperationId,
    pub payload: OperationPayload,
    pub enqueued_at: DateTime<Utc>,
    pub synced: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl SyncOperation {
    pub fn new(payload: OperationPayload) -> Self {
        Self::new_at(payload, Utc::now())
    }

    pub fn new_at(payload: OperationPayload, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: OperationId::generate(),
            payload,
            enqueued_at,
            synced: false,
            synced_at: None,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn collection(&self) -> Collection {
        self.payload.collection()
    }

    pub fn kind(&self) -> OperationKind {
        self.payload.kind()
    }

    pub fn record_id(&self) -> &RecordId {
        self.payload.record_id()
    }
}
