//! Workflow stages and the transitions between them.

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Analyzing,
    Visualizing,
    Narrating,
    ReviewingQa,
    Done,
    Failed,
}

impl WorkflowStage {
    /// The stage that follows this one on success, if any.
    pub fn next(&self) -> Option<WorkflowStage> {
        match self {
            WorkflowStage::Analyzing => Some(WorkflowStage::Visualizing),
            WorkflowStage::Visualizing => Some(WorkflowStage::Narrating),
            WorkflowStage::Narrating => Some(WorkflowStage::ReviewingQa),
            WorkflowStage::ReviewingQa => Some(WorkflowStage::Done),
            WorkflowStage::Done | WorkflowStage::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStage::Done | WorkflowStage::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Analyzing => "analyzing",
            WorkflowStage::Visualizing => "visualizing",
            WorkflowStage::Narrating => "narrating",
            WorkflowStage::ReviewingQa => "reviewing_qa",
            WorkflowStage::Done => "done",
            WorkflowStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a single run through the pipeline.
///
/// A run has no stage until [`WorkflowRun::start`] is called. After that it
/// only moves forward one stage at a time, or to `Failed` from any
/// non-terminal stage.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    id: Uuid,
    current: Option<WorkflowStage>,
    visited: Vec<WorkflowStage>,
    tokens_used: u64,
}

impl Default for WorkflowRun {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            current: None,
            visited: Vec::new(),
            tokens_used: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current stage, `None` before the pipeline starts.
    pub fn current(&self) -> Option<WorkflowStage> {
        self.current
    }

    /// Every stage entered so far, in order.
    pub fn visited(&self) -> &[WorkflowStage] {
        &self.visited
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    pub fn add_tokens(&mut self, tokens: u64) {
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    /// Enter the first stage.
    pub fn start(&mut self) -> Result<()> {
        match self.current {
            None => {
                self.enter(WorkflowStage::Analyzing);
                Ok(())
            }
            Some(from) => Err(invalid_transition(Some(from), WorkflowStage::Analyzing)),
        }
    }

    /// Move to the next stage after the current one succeeded.
    pub fn advance(&mut self) -> Result<WorkflowStage> {
        let next = self
            .current
            .and_then(|stage| stage.next())
            .ok_or_else(|| match self.current {
                Some(from) => invalid_transition(Some(from), WorkflowStage::Done),
                None => invalid_transition(None, WorkflowStage::Visualizing),
            })?;
        self.enter(next);
        Ok(next)
    }

    /// Move to `Failed`, returning the stage that failed.
    pub fn fail(&mut self) -> Result<Option<WorkflowStage>> {
        match self.current {
            Some(stage) if stage.is_terminal() => Err(invalid_transition(Some(stage), WorkflowStage::Failed)),
            failed_at => {
                self.enter(WorkflowStage::Failed);
                Ok(failed_at)
            }
        }
    }

    fn enter(&mut self, stage: WorkflowStage) {
        self.current = Some(stage);
        self.visited.push(stage);
    }
}

fn invalid_transition(from: Option<WorkflowStage>, to: WorkflowStage) -> InsightError {
    let from = from.map_or("start", |s| s.as_str());
    InsightError::Internal(format!("Invalid stage transition from {} to {}", from, to))
}
