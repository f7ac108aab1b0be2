pub mod coordinator;
pub mod tracker;

pub use coordinator::{Assistant, ExecutionSummary, OperationResult, RepositoryInfo};
pub use tracker::{OperationError, OperationKind, OperationTracker, TrackerState};
