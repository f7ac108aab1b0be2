use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Parse git status --porcelain output
///
/// Lines are decoded positionally: a two-character XY status code, a space,
/// then the path. A line that does not fit the shape is kept as an `Unknown`
/// entry rather than dropped, so information is never silently lost.
pub fn parse_status_porcelain(output: &str) -> Vec<FileEntry> {
    let mut entries = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        if line.len() < 4 {
            entries.push(FileEntry::unknown(line));
            continue;
        }

        let mut chars = line.chars();
        let index_status = chars.next().unwrap_or(' ');
        let worktree_status = chars.next().unwrap_or(' ');
        let path = line[3..].to_string();

        if path.is_empty() {
            entries.push(FileEntry::unknown(line));
            continue;
        }

        if index_status == '?' && worktree_status == '?' {
            entries.push(FileEntry {
                path,
                kind: FileKind::Untracked,
                staged: false,
                detail: None,
            });
            continue;
        }

        // Worktree status wins for display; index status decides staging.
        let code = if worktree_status != ' ' {
            worktree_status
        } else {
            index_status
        };

        let kind = FileKind::from_code(code);
        let staged = index_status != ' ' && index_status != '?';

        // Renames show up as "old -> new"; keep the new path, record the old.
        let (path, detail) = match path.split_once(" -> ") {
            Some((old, new)) if kind == FileKind::Renamed => {
                (new.to_string(), Some(format!("renamed from {old}")))
            }
            _ => (path, None),
        };

        entries.push(FileEntry {
            path,
            kind,
            staged,
            detail,
        });
    }

    entries
}

/// Parse git log output with format %H%x00%an%x00%ae%x00%aI%x00%s
pub fn parse_log(output: &str) -> Vec<CommitSummary> {
    let mut commits = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.splitn(5, '\0').collect();
        if parts.len() < 5 {
            continue;
        }

        let timestamp = DateTime::parse_from_rfc3339(parts[3])
            .map(|dt| dt.with_timezone(&Utc))
            .ok();

        commits.push(CommitSummary {
            hash: parts[0].to_string(),
            author: format!("{} <{}>", parts[1], parts[2]),
            timestamp,
            message: parts[4].to_string(),
        });
    }

    commits
}

/// Parse git remote -v output into a remote name -> fetch URL map
pub fn parse_remotes(output: &str) -> BTreeMap<String, String> {
    let mut remotes = BTreeMap::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        // fetch and push lines carry the same name; first URL seen wins
        remotes
            .entry(parts[0].to_string())
            .or_insert_with(|| parts[1].to_string());
    }

    remotes
}

/// Parse git stash list output with format %gd%x00%s
pub fn parse_stash_list(output: &str) -> Vec<StashSummary> {
    let mut stashes = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.splitn(2, '\0').collect();
        if parts.len() == 2 {
            stashes.push(StashSummary {
                index: parts[0].to_string(),
                message: parts[1].to_string(),
            });
        }
    }

    stashes
}

/// A file status entry from git status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub kind: FileKind,
    pub staged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FileEntry {
    fn unknown(line: &str) -> Self {
        Self {
            path: line.to_string(),
            kind: FileKind::Unknown,
            staged: false,
            detail: Some("unparsed status line".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Modified,
    Added,
    Deleted,
    Renamed,
    Untracked,
    Unknown,
}

impl FileKind {
    fn from_code(code: char) -> Self {
        match code {
            'M' => FileKind::Modified,
            'A' => FileKind::Added,
            'D' => FileKind::Deleted,
            'R' => FileKind::Renamed,
            '?' => FileKind::Untracked,
            _ => FileKind::Unknown,
        }
    }
}

/// A commit from git log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub hash: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub message: String,
}

/// A stash entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StashSummary {
    pub index: String,
    pub message: String,
}
