//! Data Analyst specialist.

use super::StageOutput;
use crate::agent::AgentAdapter;
use crate::dataset::{self, ColumnKind, ColumnSummary, CorrelationMatrix, TabularDataset};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Question used when the caller leaves the query blank.
pub const DEFAULT_QUERY: &str = "Provide a general analysis of this dataset";

/// Statistics computed from the dataset plus the model's reading of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub row_count: usize,
    pub column_types: BTreeMap<String, ColumnKind>,
    pub summary_statistics: BTreeMap<String, ColumnSummary>,
    pub missing_value_counts: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<CorrelationMatrix>,
    pub insights: String,
}

impl AnalysisResult {
    /// Deterministic part of the analysis; `insights` is left empty.
    pub fn profile(table: &TabularDataset) -> Self {
        Self {
            row_count: table.row_count(),
            column_types: table.column_types(),
            summary_statistics: dataset::describe(table),
            missing_value_counts: dataset::missing_values(table),
            correlation_matrix: dataset::correlation(table),
            insights: String::new(),
        }
    }

    /// Columns of the given kind, in name order.
    pub fn columns_of(&self, kind: ColumnKind) -> Vec<&str> {
        self.column_types
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Computes statistics and asks its model to interpret them.
#[derive(Debug)]
pub struct DataAnalyst {
    adapter: AgentAdapter,
}

impl DataAnalyst {
    pub fn new(adapter: AgentAdapter) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &AgentAdapter {
        &self.adapter
    }

    pub async fn analyze(&self, query: &str, table: &TabularDataset) -> Result<StageOutput<AnalysisResult>> {
        let mut result = AnalysisResult::profile(table);

        let query = if query.trim().is_empty() {
            DEFAULT_QUERY
        } else {
            query.trim()
        };
        let prompt = build_prompt(query, &result)?;

        debug!(
            rows = result.row_count,
            columns = result.column_types.len(),
            prompt_chars = prompt.len(),
            "Requesting dataset insights"
        );

        let reply = self.adapter.process(None, &prompt).await?;
        result.insights = reply.content;

        Ok(StageOutput::new(result, reply.tokens_used))
    }
}

fn build_prompt(query: &str, result: &AnalysisResult) -> Result<String> {
    let correlations = match &result.correlation_matrix {
        Some(matrix) => serde_json::to_string(matrix)?,
        None => "not available (fewer than two numeric columns)".to_string(),
    };

    Ok(format!(
        "Question: {query}\n\n\
         Dataset: {rows} rows, {cols} columns\n\
         Column types: {types}\n\
         Summary statistics: {stats}\n\
         Missing values: {missing}\n\
         Correlations: {correlations}\n\n\
         Answer the question with the key insights, notable patterns and any data quality concerns.",
        rows = result.row_count,
        cols = result.column_types.len(),
        types = serde_json::to_string(&result.column_types)?,
        stats = serde_json::to_string(&result.summary_statistics)?,
        missing = serde_json::to_string(&result.missing_value_counts)?,
    ))
}
