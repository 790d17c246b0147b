//! scout - Command-line interface for the schema context engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use scout_core::{Origin, Relationship, Result, ScoutConfig, ScoutError};
use scout_pipeline::{Pipeline, PipelineConfig};
use scout_provider::{HttpEmbedder, HttpLanguageModel};
use scout_relations::{RelationshipFile, RelationshipResolver};
use scout_retrieve::{Indexer, Planner, SchemaSnapshot, SharedSnapshot};
use scout_sqlite::{SqliteCatalog, SqliteExecutor, SqlitePool};

/// Scout - ask questions about a relational dataset in plain language
#[derive(Parser)]
#[command(name = "scout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./schema-scout.toml, then user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the configured schema for retrieval
    Index,

    /// Ask a question; prints the generated SQL, rows, and narrative
    Ask {
        /// Natural-language question
        question: String,
    },

    /// Inspect or edit relationship edges
    Relations {
        #[command(subcommand)]
        action: RelationsAction,
    },

    /// Show naming/glossary status and index statistics
    Status,
}

#[derive(Subcommand)]
enum RelationsAction {
    /// List resolved relationships with their origin
    List,

    /// Add or update a manual relationship (endpoints as table.column)
    Add {
        source: String,
        target: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Remove a manually-managed relationship
    Remove { source: String, target: String },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<PathBuf>) -> Result<ScoutConfig> {
    match path {
        Some(path) => ScoutConfig::load(&path),
        None => ScoutConfig::load_default(),
    }
}

struct Engine {
    indexer: Indexer<SqliteCatalog, HttpEmbedder>,
    pipeline: Pipeline<HttpEmbedder, HttpLanguageModel, SqliteExecutor>,
}

fn build_engine(config: &ScoutConfig) -> Result<Engine> {
    let pool = Arc::new(SqlitePool::open(
        &config.database.path,
        config.database.max_connections,
    )?);
    let catalog = Arc::new(SqliteCatalog::new(pool.clone()));
    let executor = Arc::new(SqliteExecutor::new(pool));
    let embedder = Arc::new(HttpEmbedder::new(config.provider.clone())?);
    let model = Arc::new(HttpLanguageModel::new(config.provider.clone())?);

    let shared = Arc::new(SharedSnapshot::new(SchemaSnapshot::empty(
        &config.database.schema,
    )));
    let resolver = RelationshipResolver::new(
        &config.database.schema,
        RelationshipFile::new(&config.relationships.path),
    );
    let indexer = Indexer::new(
        catalog,
        embedder.clone(),
        resolver,
        shared.clone(),
        config.retrieval.clone(),
    );

    let planner = Planner::new(shared, embedder, config.retrieval.clone());
    let pipeline = Pipeline::new(
        planner,
        model,
        executor,
        PipelineConfig {
            call_timeout: Duration::from_secs(config.provider.timeout_secs),
            retry_backoff: Duration::from_millis(config.provider.retry_backoff_ms),
            ..PipelineConfig::default()
        },
    );

    Ok(Engine { indexer, pipeline })
}

fn resolver_only(config: &ScoutConfig) -> RelationshipResolver {
    RelationshipResolver::new(
        &config.database.schema,
        RelationshipFile::new(&config.relationships.path),
    )
}

fn parse_endpoint(endpoint: &str) -> Result<(String, String)> {
    let mut parts = endpoint.splitn(2, '.');
    match (parts.next(), parts.next()) {
        (Some(table), Some(column)) if !table.is_empty() && !column.is_empty() => {
            Ok((table.to_string(), column.to_string()))
        }
        _ => Err(ScoutError::config(format!(
            "expected table.column, got {:?}",
            endpoint
        ))),
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Index => {
            let engine = build_engine(&config)?;
            let report = engine.indexer.rebuild().await?;
            println!(
                "Indexed {} tables ({} embedded, {} unchanged)",
                report.tables, report.embedded, report.skipped
            );
            println!("{}", report.naming.message());
            for error in &report.errors {
                eprintln!("warning: {}", error);
            }
        }
        Commands::Ask { question } => {
            let engine = build_engine(&config)?;
            engine.indexer.rebuild().await?;

            let ctx = engine.pipeline.run(&question).await?;
            let tables: Vec<String> = ctx
                .retrieved_tables
                .iter()
                .map(|t| t.to_string())
                .collect();
            println!("Tables: {}", tables.join(", "));
            if let Some(sql) = &ctx.sql {
                println!("\nSQL:\n{}\n", sql);
            }
            if let Some(rows) = &ctx.rows {
                println!("{}", rows.preview(50));
            }
            if let Some(narrative) = &ctx.narrative {
                println!("\n{}", narrative);
            }
        }
        Commands::Relations { action } => match action {
            RelationsAction::List => {
                let pool = Arc::new(SqlitePool::open(
                    &config.database.path,
                    config.database.max_connections,
                )?);
                let catalog = SqliteCatalog::new(pool);
                let map = resolver_only(&config).collect(&catalog, &[]).await;
                if map.is_empty() {
                    println!("No relationships resolved.");
                }
                for edge in map.edges() {
                    let description = edge
                        .description
                        .as_deref()
                        .map(|d| format!(" - {}", d))
                        .unwrap_or_default();
                    println!(
                        "{} -> {} [{}]{}",
                        edge.source(),
                        edge.target(),
                        edge.origin,
                        description
                    );
                }
            }
            RelationsAction::Add {
                source,
                target,
                description,
            } => {
                let (source_table, source_column) = parse_endpoint(&source)?;
                let (target_table, target_column) = parse_endpoint(&target)?;
                let mut edge = Relationship::new(
                    source_table,
                    source_column,
                    target_table,
                    target_column,
                    Origin::ManualEdit,
                );
                if let Some(description) = description {
                    edge = edge.with_description(description);
                }

                let affected = resolver_only(&config).add_manual_edit(&edge)?;
                println!(
                    "Saved {} -> {}; documents refresh on next index: {}",
                    edge.source(),
                    edge.target(),
                    affected.join(", ")
                );
            }
            RelationsAction::Remove { source, target } => {
                let affected = resolver_only(&config).remove_manual_edit(&source, &target)?;
                if affected.is_empty() {
                    println!("No matching relationship in {}", config.relationships.path.display());
                } else {
                    println!(
                        "Removed {} -> {}; documents refresh on next index: {}",
                        source,
                        target,
                        affected.join(", ")
                    );
                }
            }
        },
        Commands::Status => {
            let engine = build_engine(&config)?;
            let report = engine.indexer.rebuild().await?;
            let snapshot = engine.indexer.shared().load();

            println!("Schema: {}", snapshot.schema);
            println!("Tables indexed: {}", report.tables);
            println!("Documents in index: {}", snapshot.index.len());
            println!("Relationships: {}", snapshot.relationships.len());
            println!("{}", report.naming.message());
            for error in &report.errors {
                eprintln!("warning: {}", error);
            }
        }
    }

    Ok(())
}
