use crate::domain::entities::{Customer, CustomerPatch};
use crate::domain::value_objects::{RecordId, SyncStatus};
use crate::shared::error::RemoteError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A `customers` row exactly as the backend returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRow {
    pub id: String,
    pub name: String,
    pub mobile: String,
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub services: Option<Vec<String>>,
    pub payment_amount: f64,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CustomerRow {
    pub fn into_customer(self) -> Result<Customer, RemoteError> {
        Ok(Customer {
            id: RecordId::new(self.id).map_err(RemoteError::Decode)?,
            name: self.name,
            mobile: self.mobile,
            visit_date: self.visit_date,
            services: self.services.unwrap_or_default(),
            payment_amount: self.payment_amount,
            birthday: self.birthday,
            notes: self.notes,
            photo_uri: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
            sync_status: SyncStatus::Synced,
        })
    }
}

/// Insert body. Timestamps are left to the backend.
#[derive(Debug, Serialize)]
pub struct CustomerInsert<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub mobile: &'a str,
    pub visit_date: NaiveDate,
    pub services: &'a [String],
    pub payment_amount: f64,
    pub birthday: Option<NaiveDate>,
    pub notes: Option<&'a str>,
}

impl<'a> From<&'a Customer> for CustomerInsert<'a> {
    fn from(customer: &'a Customer) -> Self {
        Self {
            id: customer.id.as_str(),
            name: &customer.name,
            mobile: &customer.mobile,
            visit_date: customer.visit_date,
            services: &customer.services,
            payment_amount: customer.payment_amount,
            birthday: customer.birthday,
            notes: customer.notes.as_deref(),
        }
    }
}

/// Update body carrying only the fields the patch sets.
#[derive(Debug, Serialize)]
pub struct CustomerUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

impl<'a> From<&'a CustomerPatch> for CustomerUpdate<'a> {
    fn from(patch: &'a CustomerPatch) -> Self {
        Self {
            name: patch.name.as_deref(),
            mobile: patch.mobile.as_deref(),
            visit_date: patch.visit_date,
            services: patch.services.as_deref(),
            payment_amount: patch.payment_amount,
            birthday: patch.birthday,
            notes: patch.notes.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_row_maps_to_synced_customer() {
        let row: CustomerRow = serde_json::from_value(json!({
            "id": "4f1c",
            "name": "Alice",
            "mobile": "+15551234567",
            "visit_date": "2025-05-01",
            "services": null,
            "payment_amount": 25.5,
            "birthday": "1990-07-04",
            "notes": null,
            "created_at": "2025-05-01T09:30:00.123456+00:00",
            "updated_at": null,
            "user_id": "ignored"
        }))
        .unwrap();

        let customer = row.into_customer().unwrap();
        assert_eq!(customer.id.as_str(), "4f1c");
        assert_eq!(customer.visit_date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert_eq!(customer.payment_amount, 25.5);
        assert!(customer.services.is_empty());
        assert_eq!(customer.sync_status, SyncStatus::Synced);
        assert!(customer.photo_uri.is_none());
    }

    #[test]
    fn insert_body_uses_backend_field_names() {
        let customer = Customer {
            id: RecordId::new("c-1".into()).unwrap(),
            name: "Alice".into(),
            mobile: "+15551234567".into(),
            visit_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            services: vec!["Haircut".into()],
            payment_amount: 25.0,
            birthday: None,
            notes: Some("first visit".into()),
            photo_uri: Some("file:///local.jpg".into()),
            created_at: Utc::now(),
            updated_at: None,
            sync_status: SyncStatus::Pending,
        };
        let body = serde_json::to_value(CustomerInsert::from(&customer)).unwrap();
        assert_eq!(
            body,
            json!({
                "id": "c-1",
                "name": "Alice",
                "mobile": "+15551234567",
                "visit_date": "2025-05-01",
                "services": ["Haircut"],
                "payment_amount": 25.0,
                "birthday": null,
                "notes": "first visit"
            })
        );
    }

    #[test]
    fn update_body_omits_absent_and_local_fields() {
        let patch = CustomerPatch {
            payment_amount: Some(0.0),
            photo_uri: Some("file:///local.jpg".into()),
            ..Default::default()
        };
        let body = serde_json::to_value(CustomerUpdate::from(&patch)).unwrap();
        assert_eq!(body, json!({ "payment_amount": 0.0 }));
    }
}
