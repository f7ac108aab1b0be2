pub mod assistant;
pub mod audit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod security;

// Re-export commonly used types for convenience
pub use assistant::{Assistant, OperationResult};
pub use config::Config;
pub use error::{AppError, AppResult, GitError, GitResult};
pub use git::{GitVersion, Repository, Snapshot};
pub use security::RiskLevel;
