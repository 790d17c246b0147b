//! scout-provider - Embedding and language-model providers
//!
//! HTTP clients for an OpenAI-compatible API, plus deterministic
//! in-process implementations for tests and offline runs.

mod http;
mod mock;

pub use http::{HttpEmbedder, HttpLanguageModel};
pub use mock::{MockEmbedder, ScriptedModel};

// Re-export the provider traits for convenience
pub use scout_core::{Embedder, LanguageModel};
