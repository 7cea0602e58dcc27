//! LLM provider abstraction.
//!
//! The search core consumes language models through the [`LlmProvider`]
//! trait; the only production implementation speaks the OpenAI chat
//! completions protocol.

mod openai;
mod provider;

pub use openai::OpenAiProvider;
pub use provider::{
    CompletionOptions, CompletionResponse, LlmError, LlmProvider, Message, MessageRole,
};
