mod mappers;
mod rows;
pub mod sqlite_store;

pub use sqlite_store::SqliteLocalStore;
