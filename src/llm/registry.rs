use crate::config::settings::LLMSettings;
use crate::llm::anthropic::AnthropicClient;
use crate::llm::client::{LLMError, TextGenerator};
use crate::llm::gemini::GeminiClient;
use crate::llm::openai::OpenAIClient;
use std::env;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Interchangeable backend kinds, in registry priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAI,
    Anthropic,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Result<Self, LLMError> {
        match name {
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(LLMError::UnknownProvider(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }
}

/// Static description of one provider: identity, credential key, priority
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub kind: ProviderKind,
    pub credential_env: &'static str,
    pub priority: u8,
}

impl ProviderDescriptor {
    /// Availability is computed from the environment, never stored
    pub fn is_available(&self) -> bool {
        env::var(self.credential_env).is_ok_and(|v| !v.is_empty())
    }
}

/// Default provider table: first available credential wins
const PROVIDER_PRIORITY: [ProviderDescriptor; 3] = [
    ProviderDescriptor {
        kind: ProviderKind::Gemini,
        credential_env: "GOOGLE_API_KEY",
        priority: 0,
    },
    ProviderDescriptor {
        kind: ProviderKind::OpenAI,
        credential_env: "OPENAI_API_KEY",
        priority: 1,
    },
    ProviderDescriptor {
        kind: ProviderKind::Anthropic,
        credential_env: "ANTHROPIC_API_KEY",
        priority: 2,
    },
];

/// Priority-ordered registry of text-generation backends
///
/// Providers are lazily instantiated: no credential validation or network
/// traffic happens until the first `generate` call. The selected provider is
/// cached until `refresh` drops it, which supports runtime credential changes
/// without a restart.
pub struct ProviderRegistry {
    settings: LLMSettings,
    descriptors: Vec<ProviderDescriptor>,
    cached: Mutex<Option<(ProviderKind, Arc<dyn TextGenerator>)>>,
}

impl ProviderRegistry {
    pub fn new(settings: LLMSettings) -> Self {
        Self::with_descriptors(settings, PROVIDER_PRIORITY.to_vec())
    }

    /// Registry with a custom provider table (used by tests)
    pub fn with_descriptors(settings: LLMSettings, mut descriptors: Vec<ProviderDescriptor>) -> Self {
        descriptors.sort_by_key(|d| d.priority);
        Self {
            settings,
            descriptors,
            cached: Mutex::new(None),
        }
    }

    /// Select a provider, honoring an explicit override
    ///
    /// Auto-detection walks the priority-ordered table and picks the first
    /// descriptor whose credential is present. An override short-circuits the
    /// scan but still fails when that provider's credential is absent.
    pub fn select(
        &self,
        explicit: Option<ProviderKind>,
    ) -> Result<Arc<dyn TextGenerator>, LLMError> {
        if let Some(kind) = explicit {
            let descriptor = self
                .descriptors
                .iter()
                .find(|d| d.kind == kind)
                .ok_or_else(|| LLMError::UnknownProvider(kind.as_str().to_string()))?;

            if !descriptor.is_available() {
                return Err(LLMError::MissingCredential(
                    descriptor.credential_env.to_string(),
                ));
            }

            return self.instantiate(descriptor);
        }

        {
            let cached = self.cached.lock().unwrap();
            if let Some((kind, provider)) = cached.as_ref() {
                debug!(provider = kind.as_str(), "reusing cached provider");
                return Ok(Arc::clone(provider));
            }
        }

        let descriptor = self
            .descriptors
            .iter()
            .find(|d| d.is_available())
            .ok_or(LLMError::NoProviderAvailable)?;

        let provider = self.instantiate(descriptor)?;
        info!(provider = descriptor.kind.as_str(), "selected provider");

        let mut cached = self.cached.lock().unwrap();
        *cached = Some((descriptor.kind, Arc::clone(&provider)));
        Ok(provider)
    }

    /// Force re-evaluation of availability on the next `select`
    pub fn refresh(&self) {
        info!("refreshing provider selection");
        let mut cached = self.cached.lock().unwrap();
        *cached = None;
    }

    /// Current provider name, if one has been selected
    pub fn current(&self) -> Option<&'static str> {
        self.cached
            .lock()
            .unwrap()
            .as_ref()
            .map(|(kind, _)| kind.as_str())
    }

    /// Availability report across the provider table
    pub fn availability(&self) -> Vec<(&'static str, bool)> {
        self.descriptors
            .iter()
            .map(|d| (d.kind.as_str(), d.is_available()))
            .collect()
    }

    fn instantiate(
        &self,
        descriptor: &ProviderDescriptor,
    ) -> Result<Arc<dyn TextGenerator>, LLMError> {
        let api_key = env::var(descriptor.credential_env)
            .map_err(|_| LLMError::MissingCredential(descriptor.credential_env.to_string()))?;

        let provider: Arc<dyn TextGenerator> = match descriptor.kind {
            ProviderKind::Gemini => {
                Arc::new(GeminiClient::new(api_key, self.settings.gemini.clone())?)
            }
            ProviderKind::OpenAI => {
                Arc::new(OpenAIClient::new(api_key, self.settings.openai.clone())?)
            }
            ProviderKind::Anthropic => {
                Arc::new(AnthropicClient::new(api_key, self.settings.anthropic.clone())?)
            }
        };

        Ok(provider)
    }
}
