use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Danger tier assigned to a candidate command before any execution decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Commands that can permanently destroy committed or uncommitted work
static HIGH_RISK: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\breset\s+--hard\b",
        r"\bpush\b[^;]*\s(--force\b|--force-with-lease\b|-f\b)",
        r"\bclean\s+-[a-z]*f",
        r"\bfilter-branch\b",
        r"\breflog\s+expire\b",
        r"\bupdate-ref\s+-d\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid high-risk pattern"))
    .collect()
});

/// Commands that rewrite history or discard state but are usually recoverable
static MEDIUM_RISK: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\brebase\b",
        r"\bmerge\s+--abort\b",
        r"\bbranch\s+(-D\b|--delete\s+--force\b)",
        r"\bcheckout\s+(--force\b|-f\b)",
        r"\bcherry-pick\b",
        r"\bstash\s+(drop|clear)\b",
        r"\bremote\s+(remove|rm)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid medium-risk pattern"))
    .collect()
});

/// Classify a command string into a risk tier
///
/// Pure and deterministic: the high-risk list is checked first, then the
/// medium list; first match wins. An unrecognized command defaults to Low —
/// exhaustive whitelisting is infeasible, so only known-dangerous patterns
/// escalate.
pub fn classify(command: &str) -> RiskLevel {
    // Matched case-sensitively: git subcommands are lowercase, and -d
    // (delete merged) must not be conflated with -D (force delete).
    if HIGH_RISK.iter().any(|re| re.is_match(command)) {
        return RiskLevel::High;
    }

    if MEDIUM_RISK.iter().any(|re| re.is_match(command)) {
        return RiskLevel::Medium;
    }

    RiskLevel::Low
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}
