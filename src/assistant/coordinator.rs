use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::assistant::tracker::{self, OperationTracker, TrackerState};
use crate::audit::AuditLogger;
use crate::config::Config;
use crate::error::{AppResult, GitError};
use crate::git::{ExecutionResult, Repository, Snapshot};
use crate::llm::client::TextGenerator;
use crate::llm::registry::{ProviderKind, ProviderRegistry};
use crate::llm::{build_prompt, response};
use crate::security::risk::{self, RiskLevel};

/// Outcome of executing (or withholding) a generated command
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionSummary {
    pub executed: bool,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryInfo {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub status_summary: String,
}

impl RepositoryInfo {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        RepositoryInfo {
            path: snapshot.path.clone(),
            branch: snapshot.branch.clone(),
            status_summary: snapshot.status_summary(),
        }
    }
}

/// Complete record of one request's journey through the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub user_request: String,
    pub generated_command: Option<String>,
    pub reply: String,
    pub explanation: String,
    pub execution: ExecutionSummary,
    pub requires_confirmation: bool,
    pub risk: RiskLevel,
    pub alternatives: Vec<String>,
    pub confidence: f64,
    pub repository_info: Option<RepositoryInfo>,
    pub error: Option<String>,
}

impl OperationResult {
    fn failure(user_request: &str, error: String) -> Self {
        OperationResult {
            success: false,
            user_request: user_request.to_string(),
            generated_command: None,
            reply: String::new(),
            explanation: String::new(),
            execution: ExecutionSummary::default(),
            requires_confirmation: false,
            risk: RiskLevel::Low,
            alternatives: Vec::new(),
            confidence: 0.0,
            repository_info: None,
            error: Some(error),
        }
    }
}

/// What a withheld proposal carries over to its confirmation
///
/// A Medium/High first step of a detected multi-step operation is not
/// executed at proposal time, so the detection and the backend's advisory
/// context have to survive until `confirm_execution` runs it.
struct PendingStep {
    command: String,
    detected: Option<(tracker::OperationKind, usize)>,
    updated_context: Option<Map<String, Value>>,
}

/// Coordinates the full pipeline: state capture, prompt construction,
/// generation, interpretation, risk gating, and execution.
///
/// Execution is strictly the last step; any earlier failure leaves the
/// repository untouched.
pub struct Assistant {
    repo: Repository,
    registry: ProviderRegistry,
    config: Config,
    tracker: Mutex<OperationTracker>,
    pending: Mutex<Option<PendingStep>>,
    audit: Option<AuditLogger>,
    generator_override: Option<Arc<dyn TextGenerator>>,
}

impl Assistant {
    pub fn new(repo: Repository, config: Config) -> AppResult<Self> {
        let registry = ProviderRegistry::new(config.llm.clone());
        let audit = if config.behavior.log_commands {
            Some(AuditLogger::new()?)
        } else {
            None
        };

        Ok(Assistant {
            repo,
            registry,
            config,
            tracker: Mutex::new(OperationTracker::new()),
            pending: Mutex::new(None),
            audit,
            generator_override: None,
        })
    }

    /// Route generation through a fixed backend instead of the registry
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator_override = Some(generator);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Translate a natural-language request and, when safe, execute the
    /// resulting command
    pub async fn process_request(&self, user_request: &str) -> OperationResult {
        // Multi-step bookkeeping happens up front so the prompt can carry
        // the accumulated context. The lock is never held across an await.
        let detected = tracker::detect(user_request);
        let carried_context: Option<Map<String, Value>> = {
            let tracker = self.tracker.lock().unwrap();
            if tracker.state() == TrackerState::AwaitingStep && detected.is_some() {
                let active = tracker.active().map(|op| op.kind.as_str()).unwrap_or("");
                return OperationResult::failure(
                    user_request,
                    format!(
                        "A multi-step operation ({active}) is already in progress; \
                         finish or abort it before starting another"
                    ),
                );
            }
            tracker.active().map(|op| op.context.clone())
        };

        let snapshot = match self.repo.capture(self.config.git.max_commits).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return OperationResult::failure(
                    user_request,
                    format!("Failed to capture repository state: {e}"),
                );
            }
        };

        let prompt = build_prompt(&snapshot, user_request, carried_context.as_ref());

        let raw = match self.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => return OperationResult::failure(user_request, e),
        };

        let parsed = match response::parse(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.audit_validation_failure(user_request, &raw, &e.to_string());
                return OperationResult::failure(
                    user_request,
                    format!("Backend response could not be interpreted: {e}"),
                );
            }
        };

        let requires_confirmation =
            parsed.risk != RiskLevel::Low && self.config.behavior.require_confirmation;

        if requires_confirmation {
            info!(command = %parsed.command, risk = %parsed.risk, "command withheld for confirmation");
            self.audit_withheld(&parsed.command, parsed.risk);

            *self.pending.lock().unwrap() = Some(PendingStep {
                command: parsed.command.clone(),
                detected,
                updated_context: parsed.updated_context.clone(),
            });

            return OperationResult {
                success: true,
                user_request: user_request.to_string(),
                generated_command: Some(parsed.command),
                reply: parsed.reply,
                explanation: parsed.explanation,
                execution: ExecutionSummary::default(),
                requires_confirmation: true,
                risk: parsed.risk,
                alternatives: parsed.alternatives,
                confidence: parsed.confidence,
                repository_info: Some(RepositoryInfo::from_snapshot(&snapshot)),
                error: None,
            };
        }

        // A fresh request supersedes any unconfirmed earlier proposal.
        *self.pending.lock().unwrap() = None;

        let execution = match self.execute_gated(&parsed.command, parsed.risk).await {
            Ok(execution) => execution,
            Err(e) => return OperationResult::failure(user_request, e),
        };

        self.settle_multi_step(detected, parsed.updated_context.clone(), execution.success, false);

        let repository_info = match self.repo.capture(self.config.git.max_commits).await {
            Ok(after) => Some(RepositoryInfo::from_snapshot(&after)),
            Err(e) => {
                warn!(error = %e, "post-execution state capture failed");
                Some(RepositoryInfo::from_snapshot(&snapshot))
            }
        };

        OperationResult {
            success: execution.success,
            user_request: user_request.to_string(),
            generated_command: Some(parsed.command),
            reply: parsed.reply,
            explanation: parsed.explanation,
            error: if execution.success {
                None
            } else {
                Some("Command execution failed".to_string())
            },
            execution,
            requires_confirmation: false,
            risk: parsed.risk,
            alternatives: parsed.alternatives,
            confidence: parsed.confidence,
            repository_info,
        }
    }

    /// Execute a previously withheld command after user confirmation
    ///
    /// Replay protection: the supplied string is re-classified and must
    /// still carry the risk level that was shown at proposal time.
    pub async fn confirm_execution(&self, command: &str, shown_risk: RiskLevel) -> OperationResult {
        let current_risk = risk::classify(command);
        if current_risk != shown_risk {
            self.audit_validation_failure(
                command,
                command,
                &format!(
                    "confirmed command classifies as {current_risk}, but {shown_risk} was shown"
                ),
            );
            return OperationResult::failure(
                command,
                format!(
                    "Confirmation rejected: command risk is {current_risk}, \
                     but {shown_risk} was shown for approval"
                ),
            );
        }

        // Reclaim what the withheld proposal carried: a confirmed first step
        // of a detected multi-step operation must still begin tracking, and
        // the backend's advisory context must not be lost.
        let pending = self
            .pending
            .lock()
            .unwrap()
            .take()
            .filter(|p| p.command == command);

        let execution = match self.execute_gated(command, shown_risk).await {
            Ok(execution) => execution,
            Err(e) => return OperationResult::failure(command, e),
        };

        let (detected, updated_context) = match pending {
            Some(p) => (p.detected, p.updated_context),
            None => (None, None),
        };
        self.settle_multi_step(detected, updated_context, execution.success, true);

        let repository_info = match self.repo.capture(self.config.git.max_commits).await {
            Ok(after) => Some(RepositoryInfo::from_snapshot(&after)),
            Err(e) => {
                warn!(error = %e, "post-execution state capture failed");
                None
            }
        };

        OperationResult {
            success: execution.success,
            user_request: command.to_string(),
            generated_command: Some(command.to_string()),
            reply: if execution.success {
                "Confirmed command executed.".to_string()
            } else {
                "Confirmed command failed.".to_string()
            },
            explanation: String::new(),
            error: if execution.success {
                None
            } else {
                Some("Command execution failed".to_string())
            },
            execution,
            requires_confirmation: false,
            risk: shown_risk,
            alternatives: Vec::new(),
            confidence: 1.0,
            repository_info,
        }
    }

    /// Abort any active multi-step operation
    pub fn abort_operation(&self) -> TrackerState {
        self.tracker.lock().unwrap().abort()
    }

    /// State of the multi-step tracker
    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.lock().unwrap().state()
    }

    async fn generate(&self, prompt: &str) -> Result<String, String> {
        let generator = match &self.generator_override {
            Some(generator) => Arc::clone(generator),
            None => {
                let explicit = match self.config.llm.provider.as_str() {
                    "auto" => None,
                    name => match ProviderKind::parse(name) {
                        Ok(kind) => Some(kind),
                        Err(e) => return Err(format!("Provider selection failed: {e}")),
                    },
                };
                self.registry
                    .select(explicit)
                    .map_err(|e| format!("Provider selection failed: {e}"))?
            }
        };

        generator
            .generate(prompt)
            .await
            .map_err(|e| format!("Generation failed: {e}"))
    }

    /// Run a command through the executor, folding a non-zero exit into the
    /// summary rather than an error
    async fn execute_gated(
        &self,
        command: &str,
        risk_level: RiskLevel,
    ) -> Result<ExecutionSummary, String> {
        let outcome = self.repo.executor().execute(command).await;

        let summary = match outcome {
            Ok(ExecutionResult {
                stdout,
                stderr,
                exit_code: _,
                success,
            }) => {
                self.audit_command(command, risk_level, 0);
                ExecutionSummary {
                    executed: true,
                    success,
                    stdout,
                    stderr,
                }
            }
            Err(GitError::CommandFailed {
                exit_code,
                stdout,
                stderr,
                ..
            }) => {
                self.audit_command(command, risk_level, exit_code);
                ExecutionSummary {
                    executed: true,
                    success: false,
                    stdout,
                    stderr,
                }
            }
            Err(e) => return Err(format!("Command execution failed: {e}")),
        };

        Ok(summary)
    }

    /// Advance or abort the multi-step tracker after an execution attempt
    fn settle_multi_step(
        &self,
        detected: Option<(tracker::OperationKind, usize)>,
        updated_context: Option<Map<String, Value>>,
        execution_succeeded: bool,
        confirmed: bool,
    ) {
        let mut tracker = self.tracker.lock().unwrap();

        if let Some((kind, total_steps)) = detected {
            if tracker.state() == TrackerState::Idle {
                if let Err(e) = tracker.begin(kind, total_steps) {
                    warn!(error = %e, "failed to start multi-step tracking");
                }
            }
        }

        if tracker.state() != TrackerState::AwaitingStep {
            return;
        }

        if !execution_succeeded {
            tracker.abort();
            return;
        }

        if let Err(e) = tracker.record_step(updated_context, confirmed) {
            warn!(error = %e, "failed to record multi-step progress");
        }
    }

    fn audit_command(&self, command: &str, risk_level: RiskLevel, exit_code: i32) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_command(command, self.repo.path(), risk_level, exit_code) {
                warn!(error = %e, "audit log write failed");
            }
        }
    }

    fn audit_withheld(&self, command: &str, risk_level: RiskLevel) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_withheld(command, self.repo.path(), risk_level) {
                warn!(error = %e, "audit log write failed");
            }
        }
    }

    fn audit_validation_failure(&self, request: &str, output: &str, reason: &str) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_validation_failure(request, output, reason, self.repo.path())
            {
                warn!(error = %e, "audit log write failed");
            }
        }
    }
}
