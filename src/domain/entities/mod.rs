pub mod analytics;
pub mod customer;
pub mod operation;
pub mod record;

pub use analytics::{AnalyticsSnapshot, CachedSnapshot, PopularService, UpcomingBirthday};
pub use customer::{Customer, CustomerPatch, NewCustomer};
pub use operation::{OperationPayload, SyncOperation};
pub use record::{Record, RecordPatch};
