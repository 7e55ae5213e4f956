//! liftoff-core — shared types, job configuration, and the cluster
//! capabilities (resource manager, shared store) the launcher runs against.

pub mod config;
pub mod manager;
pub mod source;
pub mod store;
pub mod types;

pub use config::{JobDescriptor, LaunchAttributes, LaunchConfig};
pub use manager::{ManagerError, ManagerResult, ResourceManager};
pub use source::StoreUri;
pub use store::{FileStatus, SharedStore, StoreError, StorePath, StoreResult};
pub use types::*;
