use async_trait::async_trait;
use gitpilot::llm::client::{LLMError, TextGenerator};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;
use tempfile::TempDir;

/// Helper to create a test git repository
pub fn create_test_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let repo_path = temp_dir.path().to_path_buf();

    Command::new("git")
        .args(["init"])
        .current_dir(&repo_path)
        .output()
        .expect("Failed to init git repo");

    Command::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(&repo_path)
        .output()
        .expect("Failed to set git user.name");

    Command::new("git")
        .args(["config", "user.email", "test@example.com"])
        .current_dir(&repo_path)
        .output()
        .expect("Failed to set git user.email");

    (temp_dir, repo_path)
}

/// Helper to create a commit
pub fn create_commit(repo_path: &PathBuf, file: &str, content: &str, message: &str) {
    let file_path = repo_path.join(file);
    fs::write(&file_path, content).expect("Failed to write file");

    Command::new("git")
        .args(["add", file])
        .current_dir(repo_path)
        .output()
        .expect("Failed to add file");

    Command::new("git")
        .args(["commit", "-m", message])
        .current_dir(repo_path)
        .output()
        .expect("Failed to commit");
}

/// Backend stand-in that replays scripted responses in order
///
/// Repeats the last response once the script runs out. Prompts are kept
/// for assertions on what the pipeline actually sent.
pub struct MockGenerator {
    responses: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(responses: Vec<String>) -> Self {
        assert!(!responses.is_empty(), "MockGenerator needs at least one response");
        MockGenerator {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn single(response: serde_json::Value) -> Self {
        Self::new(vec![response.to_string()])
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            Ok(responses.remove(0))
        } else {
            Ok(responses[0].clone())
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
