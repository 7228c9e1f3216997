pub mod postgrest_client;
mod rows;

pub use postgrest_client::PostgrestRemoteStore;
