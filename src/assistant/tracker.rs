use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("A multi-step operation is already in progress ({0}); finish or abort it first")]
    InProgress(&'static str),

    #[error("No multi-step operation is active")]
    NoActiveOperation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    InteractiveRebase,
    CherryPickChain,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::InteractiveRebase => "interactive rebase",
            OperationKind::CherryPickChain => "cherry-pick chain",
        }
    }

    /// Step count assumed when the request doesn't state one
    fn default_steps(&self) -> usize {
        2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    AwaitingStep,
    Completed,
    Aborted,
}

/// Book-keeping for one in-flight multi-step operation
#[derive(Debug, Clone)]
pub struct OperationState {
    pub kind: OperationKind,
    pub step_index: usize,
    pub total_steps: usize,
    /// Advisory context accumulated from backend `updatedContext` payloads.
    /// Fed back into prompts, never used for control decisions.
    pub context: Map<String, Value>,
    pub confirmations: Vec<bool>,
}

/// Detect whether a request describes a multi-step operation
///
/// Matches "interactive rebase" and cherry-pick phrased as a sequence. An
/// explicit count in the request ("last 3 commits") sets the step total,
/// otherwise a per-kind default applies.
pub fn detect(request: &str) -> Option<(OperationKind, usize)> {
    let lowered = request.to_lowercase();

    let kind = if lowered.contains("interactive rebase")
        || (lowered.contains("rebase") && lowered.contains("interactive"))
    {
        OperationKind::InteractiveRebase
    } else if lowered.contains("cherry-pick") || lowered.contains("cherry pick") {
        let sequential = lowered.contains("commits")
            || lowered.contains("one by one")
            || lowered.contains("each")
            || lowered.contains("series");
        if !sequential {
            return None;
        }
        OperationKind::CherryPickChain
    } else {
        return None;
    };

    let steps = extract_count(&lowered).unwrap_or_else(|| kind.default_steps());
    Some((kind, steps))
}

fn extract_count(request: &str) -> Option<usize> {
    let mut digits = String::new();
    for ch in request.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }
    let n: usize = digits.parse().ok()?;
    if n == 0 { None } else { Some(n) }
}

/// Tracks at most one multi-step operation per repository
#[derive(Debug, Default)]
pub struct OperationTracker {
    active: Option<OperationState>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackerState {
        match &self.active {
            Some(_) => TrackerState::AwaitingStep,
            None => TrackerState::Idle,
        }
    }

    pub fn active(&self) -> Option<&OperationState> {
        self.active.as_ref()
    }

    /// Start tracking a new operation
    pub fn begin(&mut self, kind: OperationKind, total_steps: usize) -> Result<(), OperationError> {
        if let Some(current) = &self.active {
            return Err(OperationError::InProgress(current.kind.as_str()));
        }

        info!(kind = kind.as_str(), total_steps, "multi-step operation started");
        self.active = Some(OperationState {
            kind,
            step_index: 0,
            total_steps,
            context: Map::new(),
            confirmations: Vec::new(),
        });

        Ok(())
    }

    /// Record one completed step, merging the backend's advisory context
    ///
    /// Returns the resulting tracker state: `AwaitingStep` while steps
    /// remain, `Completed` once the last one lands.
    pub fn record_step(
        &mut self,
        updated_context: Option<Map<String, Value>>,
        confirmed: bool,
    ) -> Result<TrackerState, OperationError> {
        let state = self.active.as_mut().ok_or(OperationError::NoActiveOperation)?;

        if let Some(update) = updated_context {
            for (key, value) in update {
                state.context.insert(key, value);
            }
        }
        state.confirmations.push(confirmed);
        state.step_index += 1;

        debug!(
            kind = state.kind.as_str(),
            step = state.step_index,
            total = state.total_steps,
            "multi-step progress"
        );

        if state.step_index >= state.total_steps {
            info!(kind = state.kind.as_str(), "multi-step operation completed");
            self.active = None;
            return Ok(TrackerState::Completed);
        }

        Ok(TrackerState::AwaitingStep)
    }

    /// Abort the active operation, if any
    pub fn abort(&mut self) -> TrackerState {
        if let Some(state) = self.active.take() {
            info!(kind = state.kind.as_str(), "multi-step operation aborted");
            TrackerState::Aborted
        } else {
            TrackerState::Idle
        }
    }
}
