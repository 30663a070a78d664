//! API request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::budget::TokenBudget;
use crate::specialists::{AnalysisResult, Narrative, QaReview, VisualizationSet};
use crate::supervisor::{WorkflowResult, WorkflowStage, WorkflowStatus};

/// Maximum accepted query length in characters
pub const MAX_QUERY_LENGTH: usize = 4000;

/// Body of `POST /api/analysis/analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    pub dataset: DatasetPayload,
}

/// Tabular input as a list of records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetPayload {
    pub data: Vec<Value>,
}

impl DatasetPayload {
    pub fn into_value(self) -> Value {
        Value::Array(self.data)
    }
}

/// Budget figures reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsageResponse {
    pub current_usage: u64,
    pub daily_limit: u64,
    pub remaining_tokens: u64,
    /// Tokens held by calls still in flight
    pub reserved_tokens: u64,
    pub usage_by_category: BTreeMap<String, u64>,
    pub window_start: DateTime<Utc>,
}

impl From<TokenBudget> for TokenUsageResponse {
    fn from(budget: TokenBudget) -> Self {
        Self {
            current_usage: budget.used_today,
            daily_limit: budget.daily_limit,
            remaining_tokens: budget.remaining(),
            reserved_tokens: budget.reserved,
            usage_by_category: budget.per_category_usage,
            window_start: budget.window_start,
        }
    }
}

/// Successful analysis response
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub status: WorkflowStatus,
    pub run_id: Uuid,
    pub analysis: AnalysisResult,
    pub visualizations: VisualizationSet,
    pub narrative: Narrative,
    pub qa_review: QaReview,
    pub warnings: Vec<String>,
    pub token_usage: TokenUsageResponse,
    pub stages: Vec<WorkflowStage>,
    pub tokens_used: u64,
}

impl From<WorkflowResult> for AnalyzeResponse {
    fn from(result: WorkflowResult) -> Self {
        Self {
            status: result.status,
            run_id: result.run_id,
            analysis: result.analysis,
            visualizations: result.visualizations,
            narrative: result.narrative,
            qa_review: result.qa_review,
            warnings: result.warnings,
            token_usage: result.token_usage.into(),
            stages: result.stages,
            tokens_used: result.tokens_used,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Configured server name
    pub name: String,
}

impl HealthResponse {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            version: crate::VERSION.to_string(),
            name: name.into(),
        }
    }
}
