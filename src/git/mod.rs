pub mod executor;
pub mod parser;
pub mod snapshot;
pub mod version;

pub use executor::{ExecutionResult, GitExecutor};
pub use parser::{CommitSummary, FileEntry, FileKind, StashSummary};
pub use snapshot::{Repository, Snapshot};
pub use version::GitVersion;
