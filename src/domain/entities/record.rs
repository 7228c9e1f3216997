use super::customer::{Customer, CustomerPatch};
use crate::domain::value_objects::{Collection, RecordId, SyncStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mirrored domain record, tagged by the collection it lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "record")]
pub enum Record {
    #[serde(rename = "customers")]
    Customer(Customer),
}

impl Record {
    pub fn id(&self) -> &RecordId {
        match self {
            Record::Customer(customer) => &customer.id,
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            Record::Customer(_) => Collection::Customers,
        }
    }

    pub fn sync_status(&self) -> SyncStatus {
        match self {
            Record::Customer(customer) => customer.sync_status,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Record::Customer(customer) => customer.created_at,
        }
    }

    pub fn with_sync_status(mut self, status: SyncStatus) -> Self {
        match &mut self {
            Record::Customer(customer) => customer.sync_status = status,
        }
        self
    }

    pub fn as_customer(&self) -> Option<&Customer> {
        match self {
            Record::Customer(customer) => Some(customer),
        }
    }

    pub fn into_customer(self) -> Option<Customer> {
        match self {
            Record::Customer(customer) => Some(customer),
        }
    }
}

impl From<Customer> for Record {
    fn from(customer: Customer) -> Self {
        Record::Customer(customer)
    }
}

/// A partial record, as sent with an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "patch")]
pub enum RecordPatch {
    #[serde(rename = "customers")]
    Customer(CustomerPatch),
}

impl RecordPatch {
    pub fn collection(&self) -> Collection {
        match self {
            RecordPatch::Customer(_) => Collection::Customers,
        }
    }
}
