use crate::domain::value_objects::{RecordId, SyncStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A shop customer together with the details of their latest visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: RecordId,
    pub name: String,
    pub mobile: String,
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub services: Vec<String>,
    pub payment_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Path of a photo on this device. Never leaves the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

/// Form input for a customer that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub mobile: String,
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub services: Vec<String>,
    pub payment_amount: f64,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_uri: Option<String>,
}

impl NewCustomer {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Customer name is required".to_string());
        }
        if self.mobile.trim().is_empty() {
            return Err("Customer mobile is required".to_string());
        }
        validate_amount(self.payment_amount)
    }

    /// Builds the local record, `pending` until the remote store confirms it.
    pub fn into_customer(self, id: RecordId, now: DateTime<Utc>) -> Customer {
        Customer {
            id,
            name: self.name.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
            visit_date: self.visit_date,
            services: self.services,
            payment_amount: self.payment_amount,
            birthday: self.birthday,
            notes: self.notes,
            photo_uri: self.photo_uri,
            created_at: now,
            updated_at: Some(now),
            sync_status: SyncStatus::Pending,
        }
    }
}

/// Partial update. Absent fields are left alone locally and omitted remotely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_uri: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        *self == CustomerPatch::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("Customer update carries no fields".to_string());
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err("Customer name cannot be blank".to_string());
        }
        if matches!(&self.mobile, Some(mobile) if mobile.trim().is_empty()) {
            return Err("Customer mobile cannot be blank".to_string());
        }
        match self.payment_amount {
            Some(amount) => validate_amount(amount),
            None => Ok(()),
        }
    }

    /// Whether anything besides device-local fields would be sent remotely.
    pub fn touches_remote_fields(&self) -> bool {
        let remote_only = CustomerPatch {
            photo_uri: None,
            ..self.clone()
        };
        !remote_only.is_empty()
    }

    pub fn apply_to(&self, customer: &mut Customer, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            customer.name = name.trim().to_string();
        }
        if let Some(mobile) = &self.mobile {
            customer.mobile = mobile.trim().to_string();
        }
        if let Some(visit_date) = self.visit_date {
            customer.visit_date = visit_date;
        }
        if let Some(services) = &self.services {
            customer.services = services.clone();
        }
        if let Some(amount) = self.payment_amount {
            customer.payment_amount = amount;
        }
        if let Some(birthday) = self.birthday {
            customer.birthday = Some(birthday);
        }
        if let Some(notes) = &self.notes {
            customer.notes = Some(notes.clone());
        }
        if let Some(photo_uri) = &self.photo_uri {
            customer.photo_uri = Some(photo_uri.clone());
        }
        customer.updated_at = Some(now);
    }
}

fn validate_amount(amount: f64) -> Result<(), String> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("Payment amount must be a non-negative number, got {amount}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new() -> NewCustomer {
        NewCustomer {
            name: " Alice ".to_string(),
            mobile: "+15551234567".to_string(),
            visit_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            services: vec!["Haircut".to_string()],
            payment_amount: 25.0,
            birthday: None,
            notes: None,
            photo_uri: None,
        }
    }

    #[test]
    fn new_customer_starts_pending() {
        let now = Utc::now();
        let customer = sample_new().into_customer(RecordId::generate(), now);
        assert_eq!(customer.name, "Alice");
        assert_eq!(customer.sync_status, SyncStatus::Pending);
        assert_eq!(customer.created_at, now);
    }

    #[test]
    fn new_customer_validation() {
        assert!(sample_new().validate().is_ok());

        let mut blank = sample_new();
        blank.name = "   ".to_string();
        assert!(blank.validate().is_err());

        let mut negative = sample_new();
        negative.payment_amount = -1.0;
        assert!(negative.validate().is_err());

        let mut nan = sample_new();
        nan.payment_amount = f64::NAN;
        assert!(nan.validate().is_err());
    }

    #[test]
    fn camel_case_json_shape() {
        let customer = sample_new().into_customer(RecordId::new("c-1".into()).unwrap(), Utc::now());
        let value = serde_json::to_value(&customer).unwrap();
        assert_eq!(value["visitDate"], "2025-03-14");
        assert_eq!(value["paymentAmount"], 25.0);
        assert_eq!(value["syncStatus"], "pending");
        assert!(value.get("visit_date").is_none());
        assert!(value.get("photoUri").is_none());
    }

    #[test]
    fn missing_sync_status_defaults_to_pending() {
        let json = r#"{
            "id": "c-9",
            "name": "Bob",
            "mobile": "555",
            "visitDate": "2025-01-02",
            "services": [],
            "paymentAmount": 10,
            "createdAt": "2025-01-02T10:00:00Z"
        }"#;
        let customer: Customer = serde_json::from_str(json).unwrap();
        assert_eq!(customer.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let now = Utc::now();
        let mut customer = sample_new().into_customer(RecordId::generate(), now);
        let patch = CustomerPatch {
            payment_amount: Some(40.0),
            notes: Some("prefers scissors".to_string()),
            ..Default::default()
        };
        let later = now + chrono::Duration::minutes(5);
        patch.apply_to(&mut customer, later);

        assert_eq!(customer.payment_amount, 40.0);
        assert_eq!(customer.notes.as_deref(), Some("prefers scissors"));
        assert_eq!(customer.name, "Alice");
        assert_eq!(customer.updated_at, Some(later));
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert!(CustomerPatch::default().validate().is_err());
        let photo_only = CustomerPatch {
            photo_uri: Some("file:///photo.jpg".into()),
            ..Default::default()
        };
        assert!(photo_only.validate().is_ok());
        assert!(!photo_only.touches_remote_fields());
    }
}
