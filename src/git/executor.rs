use crate::error::{GitError, GitResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of executing a git command
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Executes git commands within a repository
///
/// Commands are always spawned with an argument vector, never a shell string,
/// so shell metacharacters in LLM output cannot become injection vectors.
/// This is the only type in the crate allowed to mutate the working tree.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    repo_path: PathBuf,
    timeout: Duration,
}

impl GitExecutor {
    /// Create a new GitExecutor for the given repository path
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self::with_timeout(repo_path, DEFAULT_TIMEOUT)
    }

    /// Create a GitExecutor with a custom subprocess timeout
    pub fn with_timeout<P: AsRef<Path>>(repo_path: P, timeout: Duration) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            timeout,
        }
    }

    /// Execute a git command and return the output
    ///
    /// The command string may carry a leading "git" token; it is stripped
    /// before splitting into args. Non-zero exit is an error carrying the
    /// captured stdout/stderr. A command that exceeds the timeout is killed
    /// and surfaced as `GitError::Timeout`.
    pub async fn execute(&self, command: &str) -> GitResult<ExecutionResult> {
        let command = command.trim();
        let command = command.strip_prefix("git ").unwrap_or(command);

        if command.is_empty() {
            return Err(GitError::EmptyCommand);
        }

        // No shell is involved, but reject metacharacters outright: a
        // command that carries them was not meant for an argv vector.
        for meta in ['$', '`', ';', '|', '>', '<', '&'] {
            if command.contains(meta) {
                return Err(GitError::UnsafeCommand(meta.to_string()));
            }
        }

        let args = split_args(command);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs, command).await
    }

    async fn run(&self, args: &[&str], shown: &str) -> GitResult<ExecutionResult> {
        debug!(command = shown, repo = %self.repo_path.display(), "running git");

        let child = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GitError::GitNotFound
                } else {
                    GitError::IoError(e)
                }
            })?;

        // On expiry the wait future is dropped, and kill_on_drop reaps the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GitError::Timeout {
                    command: shown.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);
        let success = output.status.success();

        if !success {
            return Err(GitError::CommandFailed {
                command: shown.to_string(),
                exit_code,
                stdout,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code,
            success,
        })
    }

    /// Get the repository path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

/// Split a command string into argv entries, honoring single and double quotes
///
/// Commit messages and pathspecs routinely contain spaces; whitespace splitting
/// alone would tear them apart.
fn split_args(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in command.chars() {
        match (c, quote) {
            ('\'' | '"', None) => quote = Some(c),
            (q, Some(open)) if q == open => quote = None,
            (c, None) if c.is_whitespace() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            (c, _) => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}
