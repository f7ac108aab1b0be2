use crate::security::risk::RiskLevel;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    /// Create a new AuditLogger with the default log path
    pub fn new() -> std::io::Result<Self> {
        let log_path = Self::default_log_path()?;
        Self::with_path(log_path)
    }

    /// Create an AuditLogger with a custom log path
    pub fn with_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();

        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { log_path })
    }

    /// Get the default log path: ~/.config/gitpilot/history.log
    fn default_log_path() -> std::io::Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            )
        })?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gitpilot")
            .join("history.log"))
    }

    /// Log a command execution with its classified risk level
    pub fn log_command(
        &self,
        command: &str,
        repo_path: &Path,
        risk: RiskLevel,
        exit_code: i32,
    ) -> std::io::Result<()> {
        let entry = format!(
            "[{}] [{}] [{}] [risk:{}] [exit:{}] {}\n",
            Utc::now().to_rfc3339(),
            Self::user(),
            repo_path.display(),
            risk,
            exit_code,
            command
        );

        self.append(&entry)
    }

    /// Log a command that was shown but withheld pending confirmation
    pub fn log_withheld(
        &self,
        command: &str,
        repo_path: &Path,
        risk: RiskLevel,
    ) -> std::io::Result<()> {
        let entry = format!(
            "[{}] [{}] [{}] [risk:{}] [WITHHELD] {}\n",
            Utc::now().to_rfc3339(),
            Self::user(),
            repo_path.display(),
            risk,
            command
        );

        self.append(&entry)
    }

    /// Log a backend response that failed validation, for forensics
    ///
    /// Records when model output fails the structural parse or the
    /// git-command check. This helps detect attack patterns and model
    /// misbehavior.
    pub fn log_validation_failure(
        &self,
        request: &str,
        raw_output: &str,
        reason: &str,
        repo_path: &Path,
    ) -> std::io::Result<()> {
        let entry = format!(
            "[{}] [{}] [{}] [VALIDATION-REJECTED] request=\"{}\" output=\"{}\" reason=\"{}\"\n",
            Utc::now().to_rfc3339(),
            Self::user(),
            repo_path.display(),
            request,
            raw_output,
            reason
        );

        self.append(&entry)
    }

    fn user() -> String {
        std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(entry.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Rotate log file if it exceeds MAX_LOG_SIZE
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(&self.log_path)?;
        if metadata.len() > MAX_LOG_SIZE {
            // Rotate: history.log -> history.log.1
            let backup_path = self.log_path.with_extension("log.1");
            fs::rename(&self.log_path, backup_path)?;
        }

        Ok(())
    }

    /// Get the path to the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_logger() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        assert_eq!(logger.log_path(), log_path);
    }

    #[test]
    fn test_log_command() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        let repo_path = Path::new("/test/repo");

        logger
            .log_command("git status", repo_path, RiskLevel::Low, 0)
            .unwrap();

        assert!(log_path.exists());

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("git status"));
        assert!(content.contains("/test/repo"));
        assert!(content.contains("risk:low"));
        assert!(content.contains("exit:0"));
    }

    #[test]
    fn test_multiple_log_entries() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        let repo_path = Path::new("/test/repo");

        logger
            .log_command("git status", repo_path, RiskLevel::Low, 0)
            .unwrap();
        logger
            .log_command("git add .", repo_path, RiskLevel::Low, 0)
            .unwrap();
        logger
            .log_withheld("git reset --hard", repo_path, RiskLevel::High)
            .unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains("git status"));
        assert!(content.contains("WITHHELD"));
        assert!(content.contains("risk:high"));
    }

    #[test]
    fn test_log_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        let repo_path = Path::new("/test/repo");

        // Write a large entry to trigger rotation
        let large_command = "git ".to_string() + &"x".repeat(MAX_LOG_SIZE as usize);
        logger
            .log_command(&large_command, repo_path, RiskLevel::Low, 0)
            .unwrap();

        // Next write should rotate first
        logger
            .log_command("git status", repo_path, RiskLevel::Low, 0)
            .unwrap();

        let backup_path = log_path.with_extension("log.1");
        assert!(backup_path.exists());

        assert!(log_path.exists());
        let metadata = fs::metadata(&log_path).unwrap();
        assert!(metadata.len() < MAX_LOG_SIZE);
    }

    #[test]
    fn test_log_validation_failure() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        let repo_path = Path::new("/test/repo");

        logger
            .log_validation_failure(
                "show me the status",
                "rm -rf /",
                "output doesn't look like a git command",
                repo_path,
            )
            .unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("VALIDATION-REJECTED"));
        assert!(content.contains("show me the status"));
        assert!(content.contains("rm -rf /"));
        assert!(content.contains("doesn't look like a git command"));
    }
}
