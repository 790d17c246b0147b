//! Configuration types for the schema context engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Data store connection configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding / language-model provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Retrieval tuning.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Relationship file location.
    #[serde(default)]
    pub relationships: RelationshipsConfig,
}

/// Data store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,

    /// Schema to index and query.
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            schema: default_schema(),
            max_connections: default_max_connections(),
        }
    }
}

/// Provider configuration for embeddings and completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Completion model id.
    #[serde(default = "default_completion_model")]
    pub completion_model: String,

    /// Embedding model id.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensionality.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Backoff before the single retry, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            completion_model: default_completion_model(),
            embedding_model: default_embedding_model(),
            dimension: default_dimension(),
            timeout_secs: default_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Retrieval tuning. The defaults are operator-tunable starting points, not
/// claims of optimality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Tables retrieved per question.
    #[serde(default = "default_k_tables")]
    pub k_tables: usize,

    /// Column count above which a table's columns are pruned via the
    /// column-level sub-search.
    #[serde(default = "default_column_threshold")]
    pub column_threshold: usize,

    /// Columns kept per pruned table (relationship-connected columns are
    /// kept on top of this).
    #[serde(default = "default_k_columns")]
    pub k_columns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k_tables: default_k_tables(),
            column_threshold: default_column_threshold(),
            k_columns: default_k_columns(),
        }
    }
}

/// Relationship file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipsConfig {
    /// Path to the TOML relationship file.
    pub path: PathBuf,
}

impl Default for RelationshipsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("relationships.toml"),
        }
    }
}

// Default value functions

fn default_schema() -> String {
    "main".to_string()
}

fn default_max_connections() -> usize {
    5
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_k_tables() -> usize {
    8
}

fn default_column_threshold() -> usize {
    20
}

fn default_k_columns() -> usize {
    10
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("schema-scout")
        .join("data.db")
}

impl ScoutConfig {
    /// Load configuration from a file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::ScoutError::config(format!("Failed to parse config: {}", e))
        })?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> crate::error::Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("schema-scout").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("schema-scout.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScoutConfig::default();
        assert_eq!(config.retrieval.k_tables, 8);
        assert_eq!(config.retrieval.column_threshold, 20);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_partial_config_parses() {
        let config: ScoutConfig = toml::from_str(
            r#"
            [retrieval]
            k_tables = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.k_tables, 4);
        assert_eq!(config.retrieval.k_columns, 10);
    }
}
