//! Model provider adapters.
//!
//! One adapter per vendor, each an immutable value implementing
//! [`ProviderAdapter`]: it knows its endpoint shape, auth headers, payload
//! layout and response envelope, and nothing else. HTTP belongs to the
//! caller.

pub mod anthropic;
pub mod detect;
pub mod gemini;
pub mod mistral;
pub mod openai;
pub mod plan;
pub mod traits;

pub use anthropic::AnthropicAdapter;
pub use detect::{create_adapter, detect_provider, PROVIDERS};
pub use gemini::GeminiAdapter;
pub use mistral::MistralAdapter;
pub use openai::OpenAiAdapter;
pub use plan::WriteFileCommand;
pub use traits::{ChatTurn, ProviderAdapter, ProviderError};
