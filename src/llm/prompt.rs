use crate::git::Snapshot;
use serde_json::{Map, Value};

/// Instruction preamble naming the exact response schema
///
/// The schema keys here are a contract with `llm::response::parse` — any
/// change to one must change the other in lockstep.
const PREAMBLE: &str = r#"You are an expert Git assistant. Your primary goal is to help users by providing the precise Git command needed to accomplish their task.

Analyze the user's request based on the provided JSON context of the repository's current state.

Respond ONLY with a valid JSON object that adheres to the following schema:
{
  "reply": "A short, friendly, natural-language confirmation of the action being taken.",
  "command": "The precise, executable Git command that accomplishes the user's request.",
  "explanation": "A brief, clear explanation of what the command does and why it's the right choice.",
  "is_destructive": "A boolean indicating if the command could cause data loss (e.g., git reset --hard, git push --force).",
  "confidence": "A float between 0.0 and 1.0 representing your confidence in the command's correctness.",
  "alternatives": "An optional list of strings, where each string is an alternative command or approach.",
  "updatedContext": "An optional JSON object predicting the Git context after the command is successfully executed."
}

IMPORTANT:
- Ensure your entire response is a single, valid JSON object.
- Do not include any markdown formatting, code blocks (```), or any text outside the JSON object.
- The 'command' field must start with 'git '."#;

/// Build the prompt text in its three fixed regions: preamble, serialized
/// snapshot, verbatim user request
///
/// When a multi-step operation is in flight its accumulated context is
/// injected between the snapshot and the request so later steps are aware of
/// earlier ones.
pub fn build_prompt(
    snapshot: &Snapshot,
    user_request: &str,
    carried_context: Option<&Map<String, Value>>,
) -> String {
    // Snapshot is always serializable; a failure here would be a bug in the
    // snapshot model, not in caller input.
    let snapshot_json = serde_json::to_string_pretty(snapshot)
        .unwrap_or_else(|_| "{}".to_string());

    let mut prompt = format!(
        "{PREAMBLE}\n\n---\nCURRENT GIT CONTEXT:\n{snapshot_json}\n"
    );

    if let Some(context) = carried_context {
        if !context.is_empty() {
            let context_json = serde_json::to_string_pretty(context)
                .unwrap_or_else(|_| "{}".to_string());
            prompt.push_str(&format!(
                "---\nONGOING MULTI-STEP OPERATION CONTEXT:\n{context_json}\n"
            ));
        }
    }

    prompt.push_str(&format!("---\nUSER'S REQUEST:\n\"{user_request}\"\n"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            branch: Some("main".to_string()),
            files: vec![crate::git::FileEntry {
                path: "src/lib.rs".to_string(),
                kind: crate::git::FileKind::Modified,
                staged: false,
                detail: None,
            }],
            commits: Vec::new(),
            remotes: BTreeMap::new(),
            stashes: Vec::new(),
            path: PathBuf::from("/tmp/repo"),
            in_merge: false,
            in_rebase: false,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_regions_in_fixed_order() {
        let prompt = build_prompt(&sample_snapshot(), "show me the status", None);

        let preamble_pos = prompt.find("expert Git assistant").unwrap();
        let context_pos = prompt.find("CURRENT GIT CONTEXT").unwrap();
        let request_pos = prompt.find("USER'S REQUEST").unwrap();

        assert!(preamble_pos < context_pos);
        assert!(context_pos < request_pos);
    }

    #[test]
    fn test_request_is_verbatim() {
        let prompt = build_prompt(&sample_snapshot(), "delete the last 3 commits", None);
        assert!(prompt.contains("\"delete the last 3 commits\""));
    }

    #[test]
    fn test_snapshot_fields_serialized() {
        let prompt = build_prompt(&sample_snapshot(), "status", None);
        assert!(prompt.contains("\"main\""));
        assert!(prompt.contains("src/lib.rs"));
        assert!(prompt.contains("\"modified\""));
    }

    #[test]
    fn test_schema_keys_present() {
        let prompt = build_prompt(&sample_snapshot(), "status", None);
        for key in [
            "\"reply\"",
            "\"command\"",
            "\"explanation\"",
            "\"is_destructive\"",
            "\"confidence\"",
            "\"alternatives\"",
            "\"updatedContext\"",
        ] {
            assert!(prompt.contains(key), "missing schema key {key}");
        }
    }

    #[test]
    fn test_carried_context_injected() {
        let mut context = Map::new();
        context.insert("step".to_string(), Value::from(2));

        let prompt = build_prompt(&sample_snapshot(), "continue", Some(&context));
        assert!(prompt.contains("ONGOING MULTI-STEP OPERATION CONTEXT"));

        let context_pos = prompt.find("ONGOING MULTI-STEP").unwrap();
        let request_pos = prompt.find("USER'S REQUEST").unwrap();
        assert!(context_pos < request_pos);
    }

    #[test]
    fn test_empty_carried_context_omitted() {
        let context = Map::new();
        let prompt = build_prompt(&sample_snapshot(), "continue", Some(&context));
        assert!(!prompt.contains("ONGOING MULTI-STEP"));
    }
}
