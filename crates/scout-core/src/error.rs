//! Error types for the schema context engine.

use thiserror::Error;

/// Result type alias using ScoutError.
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Errors that can occur in the engine.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// Malformed or empty catalog metadata for one table.
    #[error("Catalog data error for {table}: {message}")]
    Data { table: String, message: String },

    /// Embedding or language-model provider failure.
    #[error("{provider} provider error: {message}")]
    Provider {
        provider: String,
        message: String,
        /// Whether a retry could reasonably succeed.
        transient: bool,
    },

    /// No relevant schema context was found for the question.
    #[error("No relevant schema context found")]
    RetrievalEmpty,

    /// Generated SQL is not read-only.
    #[error("SQL safety violation: {reason}")]
    SafetyViolation { reason: String },

    /// Connection-level execution failure (retried once on a fresh connection).
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Query-level execution failure (terminal, surfaced verbatim).
    #[error("Query error: {message}")]
    Query { message: String },

    /// Malformed relationship config file.
    #[error("Relationship config error: {message}")]
    Config { message: String },

    /// A pipeline stage failed.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<ScoutError>,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ScoutError {
    /// Create a per-table catalog data error.
    pub fn data(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Data {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a transient provider error (worth one retry).
    pub fn provider_transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: true,
        }
    }

    /// Create a persistent provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Create a safety violation.
    pub fn safety(reason: impl Into<String>) -> Self {
        Self::SafetyViolation {
            reason: reason.into(),
        }
    }

    /// Create a connection-level execution error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query-level execution error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a relationship config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Tag an error with the pipeline stage it surfaced in.
    pub fn at_stage(self, stage: &'static str) -> Self {
        match self {
            // Already tagged; keep the innermost stage.
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Whether a single retry is expected to help.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Provider { transient: true, .. } | Self::Connection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScoutError::data("orders", "table has no columns");
        assert!(err.to_string().contains("orders"));
    }

    #[test]
    fn test_stage_tagging() {
        let err = ScoutError::RetrievalEmpty.at_stage("retrieve_context");
        assert!(err.to_string().starts_with("retrieve_context stage failed"));

        // Re-tagging keeps the innermost stage.
        let err = err.at_stage("generate_sql");
        assert!(err.to_string().starts_with("retrieve_context stage failed"));
    }

    #[test]
    fn test_transient() {
        assert!(ScoutError::provider_transient("embedding", "timeout").is_transient());
        assert!(!ScoutError::provider("llm", "bad request").is_transient());
        assert!(ScoutError::connection("stale").is_transient());
        assert!(!ScoutError::query("unknown column").is_transient());
    }
}
