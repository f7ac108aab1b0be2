use crate::error::{GitError, GitResult};
use crate::git::executor::GitExecutor;
use crate::git::parser::{self, CommitSummary, FileEntry, FileKind, StashSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Represents a git repository and captures point-in-time snapshots of it
#[derive(Debug)]
pub struct Repository {
    path: PathBuf,
    executor: GitExecutor,
}

impl Repository {
    /// Open a known git working tree, failing if the path has no .git directory
    pub fn open<P: AsRef<Path>>(path: P) -> GitResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.join(".git").exists() {
            return Err(GitError::NotARepository);
        }
        let executor = GitExecutor::new(&path);
        Ok(Self { path, executor })
    }

    /// Open a repository with a custom subprocess timeout
    pub fn open_with_timeout<P: AsRef<Path>>(path: P, timeout: Duration) -> GitResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.join(".git").exists() {
            return Err(GitError::NotARepository);
        }
        let executor = GitExecutor::with_timeout(&path, timeout);
        Ok(Self { path, executor })
    }

    /// Detect git repository from current working directory
    pub fn discover() -> GitResult<Self> {
        let current_dir = env::current_dir().map_err(GitError::IoError)?;
        Self::discover_from(&current_dir)
    }

    /// Detect git repository starting from a specific directory
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> GitResult<Self> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(".git").exists() {
                return Self::open(current);
            }

            if !current.pop() {
                return Err(GitError::NotARepository);
            }
        }
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the git executor for this repository
    pub fn executor(&self) -> &GitExecutor {
        &self.executor
    }

    /// Capture an immutable snapshot of the repository state
    ///
    /// Every request gets a fresh snapshot; nothing is cached. An empty
    /// repository has no commits and no stashes, which is not an error.
    pub async fn capture(&self, max_commits: usize) -> GitResult<Snapshot> {
        let branch = self.current_branch().await?;
        let files = self.status().await?;
        let commits = self.recent_commits(max_commits).await?;
        let remotes = self.remotes().await?;
        let stashes = self.stash_list().await?;

        let in_merge = self.path.join(".git/MERGE_HEAD").exists();
        let in_rebase = self.path.join(".git/rebase-merge").exists()
            || self.path.join(".git/rebase-apply").exists();

        debug!(
            branch = branch.as_deref().unwrap_or("(detached)"),
            files = files.len(),
            commits = commits.len(),
            "captured snapshot"
        );

        Ok(Snapshot {
            branch,
            files,
            commits,
            remotes,
            stashes,
            path: self.path.clone(),
            in_merge,
            in_rebase,
            captured_at: Utc::now(),
        })
    }

    async fn current_branch(&self) -> GitResult<Option<String>> {
        let output = self.executor.execute("branch --show-current").await?;
        let branch = output.stdout.trim();
        if branch.is_empty() {
            // Detached HEAD state
            Ok(None)
        } else {
            Ok(Some(branch.to_string()))
        }
    }

    async fn status(&self) -> GitResult<Vec<FileEntry>> {
        let output = self.executor.execute("status --porcelain").await?;
        Ok(parser::parse_status_porcelain(&output.stdout))
    }

    async fn recent_commits(&self, count: usize) -> GitResult<Vec<CommitSummary>> {
        let cmd = format!("log -n {count} --format=%H%x00%an%x00%ae%x00%aI%x00%s");
        match self.executor.execute(&cmd).await {
            Ok(output) => Ok(parser::parse_log(&output.stdout)),
            // Empty repo has no commits
            Err(GitError::CommandFailed { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn remotes(&self) -> GitResult<BTreeMap<String, String>> {
        let output = self.executor.execute("remote -v").await?;
        Ok(parser::parse_remotes(&output.stdout))
    }

    async fn stash_list(&self) -> GitResult<Vec<StashSummary>> {
        match self.executor.execute("stash list --format=%gd%x00%s").await {
            Ok(output) => Ok(parser::parse_stash_list(&output.stdout)),
            Err(GitError::CommandFailed { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

/// Immutable point-in-time view of a repository
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub branch: Option<String>,
    pub files: Vec<FileEntry>,
    pub commits: Vec<CommitSummary>,
    pub remotes: BTreeMap<String, String>,
    pub stashes: Vec<StashSummary>,
    pub path: PathBuf,
    pub in_merge: bool,
    pub in_rebase: bool,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Check if the working tree has no changes
    pub fn is_clean(&self) -> bool {
        self.files.is_empty()
    }

    /// Check if in detached HEAD state
    pub fn is_detached(&self) -> bool {
        self.branch.is_none()
    }

    /// One-line status summary for result reporting
    pub fn status_summary(&self) -> String {
        if self.is_clean() && !self.in_merge && !self.in_rebase {
            return "clean".to_string();
        }

        let staged = self.files.iter().filter(|f| f.staged).count();
        let untracked = self
            .files
            .iter()
            .filter(|f| f.kind == FileKind::Untracked)
            .count();
        let changed = self.files.len() - untracked;

        let mut summary = format!("{changed} changed, {staged} staged, {untracked} untracked");
        if self.in_merge {
            summary.push_str(", merge in progress");
        }
        if self.in_rebase {
            summary.push_str(", rebase in progress");
        }
        summary
    }
}
