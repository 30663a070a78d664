//! The supervisor: runs the four specialists in order and merges their output.

use super::state::{WorkflowRun, WorkflowStage};
use crate::agent::{AgentAdapter, AgentConfig, AgentRole, RetryConfig};
use crate::budget::{TokenBudget, TokenBudgetTracker};
use crate::dataset::TabularDataset;
use crate::error::{InsightError, Result};
use crate::specialists::{
    AnalysisResult, DataAnalyst, Narrative, Narrator, QaReview, QaReviewer, QaScoring, QaThresholds,
    VisualizationSet, Visualizer,
};
use llm::ChatModel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// First warning attached to a run whose quality review did not pass.
pub const QA_WARNING: &str = "Quality check identified potential issues";

/// Default bound on a whole run.
pub const DEFAULT_WORKFLOW_TIMEOUT: Duration = Duration::from_secs(300);

/// Default cap on dataset rows accepted by one run.
pub const DEFAULT_MAX_DATASET_ROWS: usize = 1_000_000;

/// Settings for building a [`Supervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub agents: BTreeMap<AgentRole, AgentConfig>,
    pub retry: RetryConfig,
    pub qa_thresholds: QaThresholds,
    pub qa_scoring: QaScoring,
    pub timeout: Duration,
    pub max_dataset_rows: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            agents: AgentRole::ALL
                .into_iter()
                .map(|role| (role, AgentConfig::for_role(role)))
                .collect(),
            retry: RetryConfig::default(),
            qa_thresholds: QaThresholds::default(),
            qa_scoring: QaScoring::default(),
            timeout: DEFAULT_WORKFLOW_TIMEOUT,
            max_dataset_rows: DEFAULT_MAX_DATASET_ROWS,
        }
    }
}

impl SupervisorConfig {
    pub fn with_agent(mut self, role: AgentRole, config: AgentConfig) -> Self {
        self.agents.insert(role, config);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_qa_thresholds(mut self, thresholds: QaThresholds) -> Self {
        self.qa_thresholds = thresholds;
        self
    }

    pub fn with_qa_scoring(mut self, scoring: QaScoring) -> Self {
        self.qa_scoring = scoring;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_dataset_rows(mut self, rows: usize) -> Self {
        self.max_dataset_rows = rows;
        self
    }

    fn agent(&self, role: AgentRole) -> AgentConfig {
        self.agents
            .get(&role)
            .cloned()
            .unwrap_or_else(|| AgentConfig::for_role(role))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Success,
    Error,
}

/// Merged output of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub run_id: Uuid,
    pub status: WorkflowStatus,
    pub analysis: AnalysisResult,
    pub visualizations: VisualizationSet,
    pub narrative: Narrative,
    pub qa_review: QaReview,
    pub warnings: Vec<String>,
    /// Budget snapshot taken when the run finished.
    pub token_usage: TokenBudget,
    pub stages: Vec<WorkflowStage>,
    /// Tokens this run consumed across all stages.
    pub tokens_used: u64,
}

/// A run that stopped before producing a result.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct WorkflowFailure {
    pub run_id: Uuid,
    /// Stage that failed; `None` when the request was rejected up front.
    pub failed_at: Option<WorkflowStage>,
    pub stages: Vec<WorkflowStage>,
    #[source]
    pub error: InsightError,
}

struct Artifacts {
    analysis: AnalysisResult,
    visualizations: VisualizationSet,
    narrative: Narrative,
    qa_review: QaReview,
}

/// Coordinates the specialists for one request at a time per call.
///
/// All specialists share the tracker handle given at construction.
#[derive(Debug)]
pub struct Supervisor {
    tracker: TokenBudgetTracker,
    analyst: DataAnalyst,
    visualizer: Visualizer,
    narrator: Narrator,
    reviewer: QaReviewer,
    timeout: Duration,
    max_dataset_rows: usize,
}

impl Supervisor {
    pub fn new(model: Arc<dyn ChatModel>, tracker: TokenBudgetTracker, config: SupervisorConfig) -> Self {
        let adapter = |role: AgentRole| {
            AgentAdapter::new(role, config.agent(role), Arc::clone(&model), tracker.clone())
                .with_retry(config.retry.clone())
        };

        Self {
            analyst: DataAnalyst::new(adapter(AgentRole::DataAnalyst)),
            visualizer: Visualizer::new(adapter(AgentRole::Visualizer)),
            narrator: Narrator::new(adapter(AgentRole::Narrator)),
            reviewer: QaReviewer::new(adapter(AgentRole::QaReviewer))
                .with_thresholds(config.qa_thresholds)
                .with_scoring(config.qa_scoring),
            timeout: config.timeout,
            max_dataset_rows: config.max_dataset_rows,
            tracker,
        }
    }

    pub fn tracker(&self) -> &TokenBudgetTracker {
        &self.tracker
    }

    /// Run the full pipeline for `query` over `dataset`.
    ///
    /// `dataset` is either a list of records or an object with a `data` list.
    pub async fn run(&self, query: &str, dataset: &Value) -> std::result::Result<WorkflowResult, WorkflowFailure> {
        let mut run = WorkflowRun::new();
        let span = info_span!("workflow", run_id = %run.id());

        let query = query.trim();
        if query.is_empty() {
            let error = InsightError::Validation("query must not be empty".to_string());
            return Err(Self::failure(&mut run, error));
        }

        let estimated = self
            .tracker
            .estimate(query)
            .saturating_add(self.tracker.estimator().estimate_json(dataset));
        if !self.tracker.can_proceed(estimated) {
            let remaining = self.tracker.stats().remaining();
            span.in_scope(|| warn!(estimated, remaining, "Rejecting run over daily token budget"));
            let error = InsightError::QuotaExceeded {
                requested: estimated,
                remaining,
            };
            return Err(Self::failure(&mut run, error));
        }

        let outcome = tokio::time::timeout(
            self.timeout,
            self.execute(query, dataset, &mut run).instrument(span.clone()),
        )
        .await;

        span.in_scope(|| match outcome {
            Ok(Ok(artifacts)) => Ok(self.finish(run, artifacts)),
            Ok(Err(error)) => Err(Self::failure(&mut run, error)),
            Err(_) => Err(Self::failure(&mut run, InsightError::Timeout(self.timeout))),
        })
    }

    async fn execute(&self, query: &str, dataset: &Value, run: &mut WorkflowRun) -> Result<Artifacts> {
        run.start()?;
        info!(stage = %WorkflowStage::Analyzing, "Stage started");
        let table = self.load_dataset(dataset)?;
        let analysis = self.analyst.analyze(query, &table).await?;
        Self::complete_stage(run, analysis.tokens_used)?;

        let visualizations = self.visualizer.visualize(&table, &analysis.value).await?;
        Self::complete_stage(run, visualizations.tokens_used)?;

        let narrative = self
            .narrator
            .narrate(query, &analysis.value, &visualizations.value)
            .await?;
        Self::complete_stage(run, narrative.tokens_used)?;

        let qa_review = self
            .reviewer
            .review(query, &analysis.value, &visualizations.value, &narrative.value)
            .await?;
        Self::complete_stage(run, qa_review.tokens_used)?;

        Ok(Artifacts {
            analysis: analysis.value,
            visualizations: visualizations.value,
            narrative: narrative.value,
            qa_review: qa_review.value,
        })
    }

    fn load_dataset(&self, dataset: &Value) -> Result<TabularDataset> {
        let table = TabularDataset::from_json(dataset)?;
        if table.row_count() > self.max_dataset_rows {
            return Err(InsightError::Analysis(format!(
                "dataset has {} rows, more than the limit of {}",
                table.row_count(),
                self.max_dataset_rows
            )));
        }
        Ok(table)
    }

    fn complete_stage(run: &mut WorkflowRun, tokens: u64) -> Result<()> {
        let finished = run.current();
        run.add_tokens(tokens);
        let next = run.advance()?;
        info!(
            stage = %finished.unwrap_or(WorkflowStage::Analyzing),
            tokens,
            next = %next,
            "Stage completed"
        );
        Ok(())
    }

    fn finish(&self, run: WorkflowRun, artifacts: Artifacts) -> WorkflowResult {
        let warnings = if artifacts.qa_review.passes {
            Vec::new()
        } else {
            std::iter::once(QA_WARNING.to_string())
                .chain(artifacts.qa_review.suggestions.iter().cloned())
                .collect()
        };

        info!(
            tokens = run.tokens_used(),
            qa_passed = artifacts.qa_review.passes,
            warnings = warnings.len(),
            "Workflow completed"
        );

        WorkflowResult {
            run_id: run.id(),
            status: WorkflowStatus::Success,
            analysis: artifacts.analysis,
            visualizations: artifacts.visualizations,
            narrative: artifacts.narrative,
            qa_review: artifacts.qa_review,
            warnings,
            token_usage: self.tracker.stats(),
            stages: run.visited().to_vec(),
            tokens_used: run.tokens_used(),
        }
    }

    fn failure(run: &mut WorkflowRun, error: InsightError) -> WorkflowFailure {
        let failed_at = run.fail().unwrap_or_else(|_| run.current());
        warn!(
            run_id = %run.id(),
            stage = failed_at.map_or("start", |s| s.as_str()),
            kind = %error.kind(),
            error = %error,
            "Workflow failed"
        );

        WorkflowFailure {
            run_id: run.id(),
            failed_at,
            stages: run.visited().to_vec(),
            error,
        }
    }
}
