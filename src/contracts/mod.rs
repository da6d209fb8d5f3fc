//! Contract entity and the SQLite-backed store that owns it.

pub mod batch;
pub mod cache;
pub mod events;
pub mod maintenance;
pub mod model;
pub mod query;
pub mod store;
pub mod transfer;

pub use batch::{BatchFailure, BatchOperation, BatchReport};
pub use events::{ContractEvent, ContractListener, EventRecorder, TracingListener};
pub use model::{Contract, ContractStatus};
pub use query::ContractStatistics;
pub use store::ContractStore;
