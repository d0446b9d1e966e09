//! Text-generation backend access
//!
//! The client is built explicitly from [`Config`](crate::config::Config) and
//! injected wherever generation is needed; there is no process-wide instance.

pub mod client;
pub mod models;
pub(crate) mod parse;
pub mod prompts;

pub use client::{LazyLlmClient, LlmClient, LlmResponse, TextGenerator};
pub use models::{Provider, Usage};
