//! Specialist agents
//!
//! Each specialist owns an [`AgentAdapter`](crate::agent::AgentAdapter) and
//! adds deterministic pre- and post-processing around its model call:
//!
//! - [`DataAnalyst`]: statistics plus model-written insights
//! - [`Visualizer`]: chart payloads plus chart recommendations
//! - [`Narrator`]: business narrative from analysis and charts
//! - [`QaReviewer`]: scored quality checks and improvement suggestions

pub mod data_analyst;
pub mod narrator;
pub mod qa;
pub mod visualizer;

pub use data_analyst::{AnalysisResult, DataAnalyst, DEFAULT_QUERY};
pub use narrator::{visualization_insights, Narrative, Narrator, VisualizationInsight};
pub use qa::{QaAspect, QaReview, QaReviewer, QaScoring, QaThresholds, QualityCheck, QualityScores};
pub use visualizer::{Plot, PlotKind, VisualizationSet, Visualizer, MAX_PLOTTED_COLUMNS};

/// A stage artifact and the tokens spent producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput<T> {
    pub value: T,
    pub tokens_used: u64,
}

impl<T> StageOutput<T> {
    pub fn new(value: T, tokens_used: u64) -> Self {
        Self { value, tokens_used }
    }
}
