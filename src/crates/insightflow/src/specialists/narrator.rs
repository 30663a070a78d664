//! Narrator specialist.

use super::data_analyst::AnalysisResult;
use super::visualizer::{PlotKind, VisualizationSet};
use super::StageOutput;
use crate::agent::{parser, AgentAdapter};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed caption for one chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationInsight {
    pub kind: PlotKind,
    pub subject: String,
    pub insight: String,
}

/// Business-facing write-up of the analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub executive_summary: String,
    pub key_findings: Vec<String>,
    pub business_implications: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
    pub visualization_insights: Vec<VisualizationInsight>,
}

impl Narrative {
    /// Build from a model reply. Missing fields stay empty; a reply without
    /// a JSON object becomes the executive summary.
    pub fn from_reply(reply: &str, visualization_insights: Vec<VisualizationInsight>) -> Self {
        match parser::parse_object(reply) {
            Some(map) => Self {
                executive_summary: parser::string_field(&map, "executive_summary"),
                key_findings: parser::string_list(&map, "key_findings"),
                business_implications: parser::string_list(&map, "business_implications"),
                recommendations: parser::string_list(&map, "recommendations"),
                next_steps: parser::string_list(&map, "next_steps"),
                visualization_insights,
            },
            None => Self {
                executive_summary: reply.trim().to_string(),
                visualization_insights,
                ..Self::default()
            },
        }
    }
}

/// Canned captions for each chart in the set.
pub fn visualization_insights(set: &VisualizationSet) -> Vec<VisualizationInsight> {
    set.plots
        .iter()
        .map(|plot| {
            let insight = match plot.kind {
                PlotKind::Distribution => format!("Distribution analysis of {}", plot.name),
                PlotKind::Categorical => format!("Category breakdown of {}", plot.name),
                PlotKind::Correlation => "Correlation analysis between numeric features".to_string(),
            };
            VisualizationInsight {
                kind: plot.kind,
                subject: plot.name.clone(),
                insight,
            }
        })
        .collect()
}

/// Writes the narrative from analysis and charts.
#[derive(Debug)]
pub struct Narrator {
    adapter: AgentAdapter,
}

impl Narrator {
    pub fn new(adapter: AgentAdapter) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &AgentAdapter {
        &self.adapter
    }

    pub async fn narrate(
        &self,
        query: &str,
        analysis: &AnalysisResult,
        visualizations: &VisualizationSet,
    ) -> Result<StageOutput<Narrative>> {
        let insights = visualization_insights(visualizations);
        let prompt = build_prompt(query, analysis, &insights)?;

        let reply = self.adapter.process(None, &prompt).await?;
        let narrative = Narrative::from_reply(&reply.content, insights);

        debug!(
            findings = narrative.key_findings.len(),
            recommendations = narrative.recommendations.len(),
            "Narrative assembled"
        );

        Ok(StageOutput::new(narrative, reply.tokens_used))
    }
}

fn build_prompt(
    query: &str,
    analysis: &AnalysisResult,
    insights: &[VisualizationInsight],
) -> Result<String> {
    let charts = if insights.is_empty() {
        "none".to_string()
    } else {
        insights
            .iter()
            .map(|i| format!("- {}", i.insight))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(format!(
        "Business question: {}\n\n\
         Analyst insights:\n{}\n\n\
         Summary statistics: {}\n\n\
         Charts:\n{}\n\n\
         Write the narrative as a JSON object with executive_summary, key_findings, \
         business_implications, recommendations and next_steps.",
        query.trim(),
        analysis.insights,
        serde_json::to_string(&analysis.summary_statistics)?,
        charts,
    ))
}
