//! scout-pipeline - Generation pipeline
//!
//! A sequential state machine that turns a question into a validated,
//! executed, narrated read-only query: classify intent, retrieve context,
//! generate SQL, validate safety, execute, analyze results. Each stage has
//! an explicit retry/fallback policy; terminal failures are tagged with the
//! stage they came from.

mod pipeline;
mod prompts;
mod validator;

pub use pipeline::{Pipeline, PipelineConfig, Stage};
pub use validator::validate;
