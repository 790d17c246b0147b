//! scout-core - Core types and traits for the schema context engine
//!
//! This crate provides the foundational types, traits, and error handling
//! used throughout the schema-scout system.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{Result, ScoutError};
pub use traits::*;
pub use types::*;
