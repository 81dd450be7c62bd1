//! Completion providers
//!
//! - `ChatCompletionsProvider`: OpenAI-compatible `/chat/completions` over
//!   reqwest, DeepSeek by default
//! - `MockProvider`: scripted replies and a request log for tests

mod chat_completions;
mod error;
mod mock;
mod traits;

pub use chat_completions::{ChatCompletionsProvider, ProviderSettings, DEFAULT_BASE_URL};
pub use error::{ProviderError, ProviderResult};
pub use mock::{MockProvider, MockReply};
pub use traits::{CompletionRequest, CompletionResponse, Provider};
