pub mod anthropic;
pub mod client;
pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod registry;
pub mod response;

pub use client::{LLMError, TextGenerator};
pub use prompt::build_prompt;
pub use registry::{ProviderKind, ProviderRegistry};
pub use response::{NormalizedResponse, ParseError};
