use crate::error::{GitError, GitResult};
use std::process::Command;

/// Minimum supported git version
const MIN_GIT_VERSION: (u32, u32) = (2, 20);

/// Version of the installed git binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Detect the installed git version
    ///
    /// A missing binary is a `GitNotFound` access error, distinct from an
    /// unparseable version string.
    pub fn detect() -> GitResult<Self> {
        let output = Command::new("git").arg("--version").output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::GitNotFound
            } else {
                GitError::GitVersionDetectionFailed(e.to_string())
            }
        })?;

        if !output.status.success() {
            return Err(GitError::GitVersionDetectionFailed(
                "git --version command failed".to_string(),
            ));
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse a version from a string like "git version 2.39.2"
    pub fn parse(version_str: &str) -> GitResult<Self> {
        let parts: Vec<&str> = version_str.split_whitespace().collect();

        if parts.len() < 3 || parts[0] != "git" || parts[1] != "version" {
            return Err(GitError::ParseError(format!(
                "Unexpected git version format: {version_str}"
            )));
        }

        let mut nums = parts[2].split('.');
        let major = nums
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| GitError::ParseError(format!("Invalid version: {}", parts[2])))?;
        let minor = nums
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| GitError::ParseError(format!("Invalid version: {}", parts[2])))?;
        // Patch may carry platform suffixes ("2.39.2.windows.1")
        let patch = nums.next().and_then(|n| n.parse().ok()).unwrap_or(0);

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    /// Check if this version meets the minimum requirement
    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) >= MIN_GIT_VERSION
    }

    /// Detect and require a supported git version
    pub fn validate() -> GitResult<Self> {
        let version = Self::detect()?;

        if !version.is_supported() {
            return Err(GitError::GitVersionTooOld(version.to_string()));
        }

        Ok(version)
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
