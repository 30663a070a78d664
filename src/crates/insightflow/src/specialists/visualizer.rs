//! Visualizer specialist.
//!
//! Charts are emitted as Plotly figure JSON so any Plotly front end can render
//! them without further processing. A chart that cannot be built is logged
//! and left out; it never fails the stage.

use super::data_analyst::AnalysisResult;
use super::StageOutput;
use crate::agent::{parser, AgentAdapter};
use crate::dataset::{self, Column, CorrelationMatrix, TabularDataset};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Columns charted per column kind.
pub const MAX_PLOTTED_COLUMNS: usize = 5;

const HEATMAP_NAME: &str = "Correlation Heatmap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    /// Histogram of a numeric column.
    Distribution,
    /// Bar chart of category counts.
    Categorical,
    /// Heatmap of the correlation matrix.
    Correlation,
}

/// One chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub kind: PlotKind,
    /// Column charted, or the chart name for the heatmap.
    pub name: String,
    pub title: String,
    /// Plotly figure JSON.
    pub serialized_plot: String,
}

/// Charts for one request, in build order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSet {
    pub plots: Vec<Plot>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl VisualizationSet {
    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn of_kind(&self, kind: PlotKind) -> impl Iterator<Item = &Plot> {
        self.plots.iter().filter(move |p| p.kind == kind)
    }
}

#[derive(Debug, Error)]
enum PlotError {
    #[error("column `{0}` has no numeric values")]
    NoValues(String),

    #[error("column `{0}` has no values to count")]
    NoCategories(String),

    #[error("correlation matrix has no defined values")]
    EmptyCorrelation,

    #[error("failed to serialize figure: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Builds charts and asks its model which ones matter.
#[derive(Debug)]
pub struct Visualizer {
    adapter: AgentAdapter,
}

impl Visualizer {
    pub fn new(adapter: AgentAdapter) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &AgentAdapter {
        &self.adapter
    }

    /// Build every chart the table supports, skipping the ones that fail.
    pub fn build_plots(table: &TabularDataset, analysis: &AnalysisResult) -> Vec<Plot> {
        let mut plots = Vec::new();

        for column in table.numeric_columns().into_iter().take(MAX_PLOTTED_COLUMNS) {
            push_or_skip(&mut plots, column.name(), distribution_plot(column));
        }

        for column in table.categorical_columns().into_iter().take(MAX_PLOTTED_COLUMNS) {
            push_or_skip(&mut plots, column.name(), categorical_plot(column));
        }

        if table.numeric_columns().len() >= 2 {
            let matrix = analysis
                .correlation_matrix
                .clone()
                .or_else(|| dataset::correlation(table));
            if let Some(matrix) = matrix {
                push_or_skip(&mut plots, HEATMAP_NAME, heatmap_plot(&matrix));
            }
        }

        plots
    }

    pub async fn visualize(
        &self,
        table: &TabularDataset,
        analysis: &AnalysisResult,
    ) -> Result<StageOutput<VisualizationSet>> {
        let plots = Self::build_plots(table, analysis);
        debug!(plots = plots.len(), "Built charts");

        if plots.is_empty() {
            return Ok(StageOutput::new(VisualizationSet::default(), 0));
        }

        let prompt = build_prompt(&plots, analysis);
        let reply = self.adapter.process(None, &prompt).await?;

        let recommendations = match parser::parse_object(&reply.content) {
            Some(map) => parser::string_list(&map, "recommendations"),
            None => parser::text_lines(&reply.content),
        };

        Ok(StageOutput::new(
            VisualizationSet {
                plots,
                recommendations,
            },
            reply.tokens_used,
        ))
    }
}

fn push_or_skip(plots: &mut Vec<Plot>, name: &str, plot: std::result::Result<Plot, PlotError>) {
    match plot {
        Ok(plot) => plots.push(plot),
        Err(e) => warn!(chart = name, error = %e, "Skipping chart"),
    }
}

fn distribution_plot(column: &Column) -> std::result::Result<Plot, PlotError> {
    let values = column.numeric_values();
    if values.is_empty() {
        return Err(PlotError::NoValues(column.name().to_string()));
    }

    let title = format!("Distribution of {}", column.name());
    let figure = json!({
        "data": [{
            "type": "histogram",
            "x": values,
            "name": column.name(),
        }],
        "layout": layout(&title, column.name(), "Count"),
    });

    Ok(Plot {
        kind: PlotKind::Distribution,
        name: column.name().to_string(),
        title,
        serialized_plot: serde_json::to_string(&figure)?,
    })
}

fn categorical_plot(column: &Column) -> std::result::Result<Plot, PlotError> {
    let counts = dataset::value_counts(column);
    if counts.is_empty() {
        return Err(PlotError::NoCategories(column.name().to_string()));
    }

    let title = format!("Value counts of {}", column.name());
    let labels: Vec<&str> = counts.iter().map(|c| c.value.as_str()).collect();
    let totals: Vec<usize> = counts.iter().map(|c| c.count).collect();
    let figure = json!({
        "data": [{
            "type": "bar",
            "x": labels,
            "y": totals,
            "name": column.name(),
        }],
        "layout": layout(&title, column.name(), "Count"),
    });

    Ok(Plot {
        kind: PlotKind::Categorical,
        name: column.name().to_string(),
        title,
        serialized_plot: serde_json::to_string(&figure)?,
    })
}

fn heatmap_plot(matrix: &CorrelationMatrix) -> std::result::Result<Plot, PlotError> {
    if !matrix.has_values() {
        return Err(PlotError::EmptyCorrelation);
    }

    let figure = json!({
        "data": [{
            "type": "heatmap",
            "z": matrix.values,
            "x": matrix.columns,
            "y": matrix.columns,
            "colorscale": "RdBu",
            "zmin": -1.0,
            "zmax": 1.0,
        }],
        "layout": {
            "title": {"text": HEATMAP_NAME},
            "template": "plotly_white",
        },
    });

    Ok(Plot {
        kind: PlotKind::Correlation,
        name: HEATMAP_NAME.to_string(),
        title: HEATMAP_NAME.to_string(),
        serialized_plot: serde_json::to_string(&figure)?,
    })
}

fn layout(title: &str, x_title: &str, y_title: &str) -> Value {
    json!({
        "title": {"text": title},
        "xaxis": {"title": {"text": x_title}},
        "yaxis": {"title": {"text": y_title}},
        "template": "plotly_white",
    })
}

fn build_prompt(plots: &[Plot], analysis: &AnalysisResult) -> String {
    let chart_lines: Vec<String> = plots
        .iter()
        .map(|p| format!("- {} ({:?})", p.title, p.kind))
        .collect();
    let columns: Vec<String> = analysis
        .column_types
        .iter()
        .map(|(name, kind)| format!("{} ({:?})", name, kind))
        .collect();

    format!(
        "Charts generated:\n{}\n\nColumns: {}\nRows: {}\n\n\
         Recommend which of these charts best communicate the findings and what \
         additional views would help. Answer with one recommendation per line.",
        chart_lines.join("\n"),
        columns.join(", "),
        analysis.row_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::StaticModel;
    use crate::agent::AgentRole;
    use crate::budget::TokenBudgetTracker;
    use std::sync::Arc;

    fn table(value: Value) -> TabularDataset {
        TabularDataset::from_json(&value).unwrap()
    }

    fn visualizer(model: Arc<StaticModel>) -> Visualizer {
        Visualizer::new(AgentAdapter::for_role(
            AgentRole::Visualizer,
            model,
            TokenBudgetTracker::new(100_000),
        ))
    }

    #[test]
    fn test_numeric_and_categorical_charts() {
        let t = table(json!([{"a": 1, "b": "x"}, {"a": 2, "b": "y"}, {"a": 3, "b": "x"}]));
        let plots = Visualizer::build_plots(&t, &AnalysisResult::profile(&t));

        assert_eq!(plots.len(), 2);
        assert_eq!(plots[0].kind, PlotKind::Distribution);
        assert_eq!(plots[0].name, "a");
        assert_eq!(plots[1].kind, PlotKind::Categorical);
        assert_eq!(plots[1].name, "b");

        let bar: Value = serde_json::from_str(&plots[1].serialized_plot).unwrap();
        assert_eq!(bar["data"][0]["type"], "bar");
        assert_eq!(bar["data"][0]["x"], json!(["x", "y"]));
        assert_eq!(bar["data"][0]["y"], json!([2, 1]));
    }

    #[test]
    fn test_heatmap_with_two_numeric_columns() {
        let t = table(json!([{"a": 1, "c": 2}, {"a": 2, "c": 5}, {"a": 3, "c": 4}]));
        let plots = Visualizer::build_plots(&t, &AnalysisResult::profile(&t));

        let heatmaps: Vec<_> = plots.iter().filter(|p| p.kind == PlotKind::Correlation).collect();
        assert_eq!(heatmaps.len(), 1);
        assert_eq!(heatmaps[0].name, "Correlation Heatmap");

        let figure: Value = serde_json::from_str(&heatmaps[0].serialized_plot).unwrap();
        assert_eq!(figure["data"][0]["type"], "heatmap");
    }

    #[test]
    fn test_column_caps() {
        let mut record = serde_json::Map::new();
        for i in 0..7 {
            record.insert(format!("n{}", i), json!(i));
            record.insert(format!("c{}", i), json!(format!("v{}", i)));
        }
        let t = table(Value::Array(vec![Value::Object(record.clone()), Value::Object(record)]));
        let plots = Visualizer::build_plots(&t, &AnalysisResult::profile(&t));

        let set = VisualizationSet {
            plots,
            recommendations: vec![],
        };
        assert_eq!(set.of_kind(PlotKind::Distribution).count(), MAX_PLOTTED_COLUMNS);
        assert_eq!(set.of_kind(PlotKind::Categorical).count(), MAX_PLOTTED_COLUMNS);
    }

    #[test]
    fn test_failed_chart_is_skipped() {
        // an all-null column is categorical with nothing to count; constant
        // numeric columns leave the heatmap without defined values
        let t = table(json!([
            {"a": 1, "c": 7, "empty": null},
            {"a": 1, "c": 7, "empty": null}
        ]));
        let plots = Visualizer::build_plots(&t, &AnalysisResult::profile(&t));

        let names: Vec<&str> = plots.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_no_plottable_columns_skips_model() {
        let model = Arc::new(StaticModel::new("unused"));
        let t = table(json!([{"flag": true}, {"flag": false}]));

        let output = visualizer(model.clone())
            .visualize(&t, &AnalysisResult::profile(&t))
            .await
            .unwrap();

        assert!(output.value.is_empty());
        assert_eq!(output.tokens_used, 0);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_recommendations_from_reply_lines() {
        let model = Arc::new(StaticModel::new("1. Lead with the histogram\n2. Drop the bar chart"));
        let t = table(json!([{"a": 1, "b": "x"}, {"a": 2, "b": "y"}]));

        let output = visualizer(model)
            .visualize(&t, &AnalysisResult::profile(&t))
            .await
            .unwrap();

        assert_eq!(output.value.len(), 2);
        assert_eq!(
            output.value.recommendations,
            vec!["Lead with the histogram", "Drop the bar chart"]
        );
    }
}
