//! Prompt templates and reply cleanup for the generation pipeline.

use scout_core::Intent;

/// Prompt for the intent classification call.
pub fn classify_intent(question: &str) -> String {
    format!(
        "Classify the following question about a relational dataset into exactly one of: \
         aggregation, time_series, lookup, comparison, analysis.\n\n\
         Question: {}\n\n\
         Reply with the single category name only.",
        question
    )
}

/// Prompt for the SQL generation call.
pub fn generate_sql(question: &str, context: &str, intent: Intent) -> String {
    format!(
        "Generate a SQL query to answer this question:\n\n\
         Question: {}\n\
         Question type: {}\n\n\
         Relevant schema context:\n{}\n\n\
         IMPORTANT SQL RULES:\n\
         1. Always use schema.table format from the context provided\n\
         2. Use lowercase table and column names\n\
         3. Do NOT nest aggregate functions (AVG, SUM, COUNT, etc.)\n\
         4. Use subqueries or CTEs for complex calculations\n\
         5. Prefer explicit joins over nested aggregation\n\
         6. Use the listed relationships verbatim for join predicates\n\
         7. Generate ONLY SELECT queries - no INSERT, UPDATE, DELETE, DROP, or DDL\n\n\
         Generate ONLY the SQL query without any explanation.",
        question, intent, context
    )
}

/// Prompt for the result analysis call.
pub fn analyze_results(question: &str, sql: &str, preview: &str) -> String {
    format!(
        "Analyze these query results to answer the user's question:\n\n\
         Question: {}\n\n\
         SQL Query:\n{}\n\n\
         Query Results (first rows):\n{}\n\n\
         Provide a clear, concise analysis that directly answers the question. \
         Include key insights from the data.",
        question, sql, preview
    )
}

/// Strip markdown fences and `USE DATABASE` statements from a generated
/// reply, leaving bare SQL.
pub fn clean_sql(raw: &str) -> String {
    let stripped = raw.replace("```sql", "").replace("```", "");
    stripped
        .lines()
        .filter(|line| !line.trim().to_uppercase().starts_with("USE DATABASE"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_sql_strips_fences() {
        let raw = "```sql\nSELECT * FROM northwind.orders\n```";
        assert_eq!(clean_sql(raw), "SELECT * FROM northwind.orders");
    }

    #[test]
    fn test_clean_sql_drops_use_database() {
        let raw = "USE DATABASE sales;\nSELECT 1";
        assert_eq!(clean_sql(raw), "SELECT 1");
    }

    #[test]
    fn test_generate_prompt_carries_context() {
        let prompt = generate_sql("top customers", "Schema: northwind", Intent::Aggregation);
        assert!(prompt.contains("top customers"));
        assert!(prompt.contains("Schema: northwind"));
        assert!(prompt.contains("ONLY SELECT"));
    }
}
