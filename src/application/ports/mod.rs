pub mod connectivity;
pub mod local_store;
pub mod remote_store;

pub use connectivity::{ConnectivityProbe, ReachabilityListener};
pub use local_store::LocalStore;
pub use remote_store::RemoteStore;
