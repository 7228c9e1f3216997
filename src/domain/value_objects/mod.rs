pub mod collection;
pub mod operation_id;
pub mod operation_kind;
pub mod record_id;
pub mod sync_status;

pub use collection::Collection;
pub use operation_id::OperationId;
pub use operation_kind::OperationKind;
pub use record_id::RecordId;
pub use sync_status::SyncStatus;
