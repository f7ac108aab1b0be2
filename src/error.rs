use std::io;
use thiserror::Error;

use crate::assistant::tracker::OperationError;
use crate::config::settings::ConfigError;
use crate::llm::client::LLMError;
use crate::llm::response::ParseError;

/// Errors that can occur while reading or mutating a repository
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Git binary not found on PATH")]
    GitNotFound,

    #[error("Git command 'git {command}' failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Git command 'git {command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Command contains unsafe characters: {0}")]
    UnsafeCommand(String),

    #[error("Empty command")]
    EmptyCommand,

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Git version {0} is too old. Minimum required: 2.20")]
    GitVersionTooOld(String),

    #[error("Failed to detect git version: {0}")]
    GitVersionDetectionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Top-level application error that wraps all module-specific errors
///
/// This provides a unified error type for application-level code while preserving
/// the specific error context from each module. All module errors automatically
/// convert to AppError via the `From` trait.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    #[error("Response parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
