//! Sequential generation state machine.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use scout_core::{
    Embedder, Intent, LanguageModel, QueryContext, QueryExecutor, Result, ScoutError,
};
use scout_retrieve::Planner;

use crate::prompts;
use crate::validator;

/// Stages in execution order. Within one run there is no reordering or
/// speculative execution; each stage consumes the previous stage's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ClassifyIntent,
    RetrieveContext,
    GenerateSql,
    ValidateSafety,
    Execute,
    AnalyzeResults,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::ClassifyIntent => "classify_intent",
            Self::RetrieveContext => "retrieve_context",
            Self::GenerateSql => "generate_sql",
            Self::ValidateSafety => "validate_safety",
            Self::Execute => "execute",
            Self::AnalyzeResults => "analyze_results",
        }
    }
}

/// Tuning for provider calls and result previews.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Timeout applied to every provider call.
    pub call_timeout: Duration,

    /// Backoff before the single retry of a failed provider call.
    pub retry_backoff: Duration,

    /// Rows shown to the analysis call.
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_millis(500),
            preview_rows: 10,
        }
    }
}

/// The generation pipeline: one instance serves many concurrent runs, each
/// with its own [`QueryContext`].
pub struct Pipeline<E, M, X> {
    planner: Planner<E>,
    model: Arc<M>,
    executor: Arc<X>,
    config: PipelineConfig,
}

impl<E, M, X> Pipeline<E, M, X>
where
    E: Embedder,
    M: LanguageModel,
    X: QueryExecutor,
{
    pub fn new(planner: Planner<E>, model: Arc<M>, executor: Arc<X>, config: PipelineConfig) -> Self {
        Self {
            planner,
            model,
            executor,
            config,
        }
    }

    /// Run the full pipeline for one question.
    ///
    /// Terminal errors are tagged with the stage they surfaced in. The
    /// narrative is best-effort: an analysis failure still returns the SQL
    /// and rows.
    pub async fn run(&self, question: &str) -> Result<QueryContext> {
        let mut ctx = QueryContext::new(question);
        info!("Pipeline run {} for {:?}", ctx.run_id, question);

        // An unindexed schema short-circuits before any provider call.
        if !self.planner.is_indexed() {
            return Err(ScoutError::RetrievalEmpty.at_stage(Stage::RetrieveContext.name()));
        }

        self.classify_intent(&mut ctx).await;
        self.retrieve_context(&mut ctx)
            .await
            .map_err(|e| e.at_stage(Stage::RetrieveContext.name()))?;
        self.generate_sql(&mut ctx)
            .await
            .map_err(|e| e.at_stage(Stage::GenerateSql.name()))?;
        self.validate_safety(&ctx)
            .map_err(|e| e.at_stage(Stage::ValidateSafety.name()))?;
        self.execute(&mut ctx)
            .await
            .map_err(|e| e.at_stage(Stage::Execute.name()))?;
        self.analyze_results(&mut ctx).await;

        info!("Pipeline run {} finished", ctx.run_id);
        Ok(ctx)
    }

    /// One provider call under the configured timeout, retried once with
    /// backoff on provider failure. Internal retries are logged, never
    /// surfaced to the caller.
    async fn call_model(&self, prompt: &str) -> Result<String> {
        match self.try_call(prompt).await {
            Ok(reply) => Ok(reply),
            Err(e @ ScoutError::Provider { .. }) => {
                warn!("Provider call failed, retrying once: {}", e);
                sleep(self.config.retry_backoff).await;
                self.try_call(prompt).await
            }
            Err(e) => Err(e),
        }
    }

    async fn try_call(&self, prompt: &str) -> Result<String> {
        match timeout(self.config.call_timeout, self.model.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ScoutError::provider_transient(
                "language-model",
                format!("call timed out after {:?}", self.config.call_timeout),
            )),
        }
    }

    /// Classify the question's intent; falls back to `analysis` rather than
    /// aborting the run.
    async fn classify_intent(&self, ctx: &mut QueryContext) {
        let prompt = prompts::classify_intent(&ctx.question);
        let intent = match self.call_model(&prompt).await {
            Ok(reply) => Intent::parse(&reply).unwrap_or_default(),
            Err(e) => {
                warn!("Intent classification failed, using default: {}", e);
                Intent::default()
            }
        };
        debug!("Classified intent: {}", intent);
        ctx.intent = Some(intent);
    }

    async fn retrieve_context(&self, ctx: &mut QueryContext) -> Result<()> {
        let plan = self.planner.plan(&ctx.question).await?;
        ctx.retrieved_tables = plan.table_ids();
        ctx.retrieved_columns = plan
            .tables
            .iter()
            .flat_map(|t| {
                t.kept_columns
                    .iter()
                    .map(move |c| (t.table.clone(), c.clone()))
            })
            .collect();
        ctx.context_text = Some(plan.context);
        Ok(())
    }

    async fn generate_sql(&self, ctx: &mut QueryContext) -> Result<()> {
        let context = ctx
            .context_text
            .as_deref()
            .ok_or_else(|| ScoutError::internal("generate_sql before retrieve_context"))?;
        let prompt = prompts::generate_sql(
            &ctx.question,
            context,
            ctx.intent.unwrap_or_default(),
        );

        let reply = self.call_model(&prompt).await?;
        let sql = prompts::clean_sql(&reply);
        if sql.is_empty() {
            return Err(ScoutError::provider("language-model", "empty SQL reply"));
        }
        debug!("Generated SQL: {}", sql);
        ctx.sql = Some(sql);
        Ok(())
    }

    fn validate_safety(&self, ctx: &QueryContext) -> Result<()> {
        let sql = ctx
            .sql
            .as_deref()
            .ok_or_else(|| ScoutError::internal("validate before generate_sql"))?;
        validator::validate(sql)
    }

    /// Execute the validated statement. Connection-level failures get one
    /// retry against a fresh connection; query-level failures are terminal
    /// and surfaced verbatim.
    async fn execute(&self, ctx: &mut QueryContext) -> Result<()> {
        let sql = ctx
            .sql
            .as_deref()
            .ok_or_else(|| ScoutError::internal("execute before generate_sql"))?;

        let rows = match self.executor.execute(sql).await {
            Ok(rows) => rows,
            Err(e @ ScoutError::Connection { .. }) => {
                warn!("Connection failed, retrying on a fresh connection: {}", e);
                self.executor.execute(sql).await?
            }
            Err(e) => return Err(e),
        };

        debug!("Execution returned {} rows", rows.rows.len());
        ctx.rows = Some(rows);
        Ok(())
    }

    /// Narrate the result rows. Failures leave the narrative empty; the
    /// caller still gets the SQL and rows.
    async fn analyze_results(&self, ctx: &mut QueryContext) {
        let Some(rows) = ctx.rows.as_ref() else {
            return;
        };
        if rows.is_empty() {
            ctx.narrative = Some("No results found for this query.".to_string());
            return;
        }

        let sql = ctx.sql.as_deref().unwrap_or_default();
        let prompt =
            prompts::analyze_results(&ctx.question, sql, &rows.preview(self.config.preview_rows));
        match self.call_model(&prompt).await {
            Ok(reply) => ctx.narrative = Some(reply.trim().to_string()),
            Err(e) => warn!("Result analysis failed, returning raw rows: {}", e),
        }
    }
}
