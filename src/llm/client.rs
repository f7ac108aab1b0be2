use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to a text-generation backend
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("No LLM provider is available. Set GOOGLE_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY")]
    NoProviderAvailable,

    #[error("Credential {0} is not set for the requested provider")]
    MissingCredential(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Rate limit exceeded, retry after {0}s")]
    RateLimited(u64),

    #[error("API returned status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Empty or malformed API response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl LLMError {
    /// Whether the caller may safely retry the request
    ///
    /// Communication failures happen before any repository mutation, so a
    /// retry is harmless. Quota errors should back off instead.
    pub fn is_transient(&self) -> bool {
        matches!(self, LLMError::Network(_))
    }
}

/// Capability interface over interchangeable text-generation backends
///
/// One outbound request per call; the response is an opaque text blob
/// regardless of provider. No retries happen at this layer — retry policy
/// belongs to the caller, which can distinguish the error kinds above.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate raw text for the given prompt
    async fn generate(&self, prompt: &str) -> Result<String, LLMError>;

    /// Human-readable backend name for logging and results
    fn name(&self) -> &'static str;
}
