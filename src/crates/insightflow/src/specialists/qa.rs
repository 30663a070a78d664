//! QA Reviewer specialist.
//!
//! Scores come from deterministic checks over the other artifacts. The
//! reviewer model only contributes improvement suggestions.

use super::data_analyst::AnalysisResult;
use super::narrator::Narrative;
use super::visualizer::{VisualizationSet, MAX_PLOTTED_COLUMNS};
use super::StageOutput;
use crate::agent::{parser, AgentAdapter};
use crate::dataset::{ColumnKind, ColumnSummary};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaAspect {
    DataInterpretation,
    VisualizationClarity,
    NarrativeQuality,
}

impl QaAspect {
    pub fn label(&self) -> &'static str {
        match self {
            QaAspect::DataInterpretation => "Data Interpretation",
            QaAspect::VisualizationClarity => "Visualization Clarity",
            QaAspect::NarrativeQuality => "Narrative Quality",
        }
    }
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub aspect: QaAspect,
    pub name: String,
    /// Fraction of criteria met.
    pub score: f64,
    pub passed: bool,
    /// Criteria that were not met.
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub clarity: f64,
    pub accuracy: f64,
    pub actionability: f64,
}

/// Minimum scores for a review to pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaThresholds {
    pub min_clarity: f64,
    pub min_accuracy: f64,
    pub min_actionability: f64,
}

impl Default for QaThresholds {
    fn default() -> Self {
        Self {
            min_clarity: 0.7,
            min_accuracy: 0.8,
            min_actionability: 0.7,
        }
    }
}

impl QaThresholds {
    pub fn passes(&self, scores: &QualityScores) -> bool {
        scores.clarity >= self.min_clarity
            && scores.accuracy >= self.min_accuracy
            && scores.actionability >= self.min_actionability
    }
}

/// Where scores come from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QaScoring {
    /// Derived from the check outcomes.
    #[default]
    Computed,
    /// Constant scores regardless of content, for demos and tests.
    Fixed(QualityScores),
}

/// Final review of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReview {
    pub checks: Vec<QualityCheck>,
    pub suggestions: Vec<String>,
    pub scores: QualityScores,
    pub passes: bool,
}

struct Criterion {
    met: bool,
    issue: &'static str,
    suggestion: &'static str,
}

impl Criterion {
    fn new(met: bool, issue: &'static str, suggestion: &'static str) -> Self {
        Self {
            met,
            issue,
            suggestion,
        }
    }
}

fn fraction_met(criteria: &[Criterion]) -> f64 {
    if criteria.is_empty() {
        return 1.0;
    }
    criteria.iter().filter(|c| c.met).count() as f64 / criteria.len() as f64
}

fn has_text(s: &str) -> bool {
    !s.trim().is_empty()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `term` occurs in `text` as a whole word, ignoring case.
fn mentions(text: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    text.match_indices(term.as_str()).any(|(start, m)| {
        let before = text[..start].chars().next_back();
        let after = text[start + m.len()..].chars().next();
        !before.map_or(false, is_word_char) && !after.map_or(false, is_word_char)
    })
}

/// Column names and dominant category values of the analysed table.
fn data_terms(analysis: &AnalysisResult) -> Vec<&str> {
    let tops = analysis
        .summary_statistics
        .values()
        .filter_map(|summary| match summary {
            ColumnSummary::Categorical { top: Some(top), .. } => Some(top.as_str()),
            _ => None,
        });
    analysis.column_types.keys().map(String::as_str).chain(tops).collect()
}

fn references_data(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| mentions(text, term))
}

/// Numeric literals written in `text`, each with its number of decimals.
///
/// Percentages, ordinals and multipliers such as `3x` are skipped, as are
/// digits glued to words like `Q3`.
fn quoted_numbers(text: &str) -> Vec<(f64, i32)> {
    let chars: Vec<char> = text.chars().collect();
    let mut numbers = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        if !chars[i].is_ascii_digit() || prev.map_or(false, |p| is_word_char(p) || p == '.') {
            i += 1;
            continue;
        }

        let negative = prev == Some('-') && (i < 2 || !is_word_char(chars[i - 2]));
        let mut literal = String::new();
        while i < chars.len() {
            let c = chars[i];
            let grouped = c == ',' && chars.get(i + 1).map_or(false, char::is_ascii_digit);
            if c.is_ascii_digit() {
                literal.push(c);
            } else if !grouped {
                break;
            }
            i += 1;
        }

        let mut decimals = 0;
        if chars.get(i) == Some(&'.') && chars.get(i + 1).map_or(false, char::is_ascii_digit) {
            literal.push('.');
            i += 1;
            while let Some(c) = chars.get(i).filter(|c| c.is_ascii_digit()) {
                literal.push(*c);
                decimals += 1;
                i += 1;
            }
        }

        if chars.get(i).map_or(false, |c| c.is_alphabetic() || *c == '%') {
            continue;
        }
        if let Ok(value) = literal.parse::<f64>() {
            numbers.push((if negative { -value } else { value }, decimals));
        }
    }

    numbers
}

/// Every figure the analysis produced.
fn known_values(analysis: &AnalysisResult) -> Vec<f64> {
    let mut known = vec![analysis.row_count as f64, analysis.column_types.len() as f64];
    known.extend(analysis.missing_value_counts.values().map(|&n| n as f64));

    for summary in analysis.summary_statistics.values() {
        match summary {
            ColumnSummary::Numeric {
                count,
                mean,
                std,
                min,
                p25,
                p50,
                p75,
                max,
            } => {
                known.extend([*count as f64, *mean, *min, *p25, *p50, *p75, *max]);
                known.extend(*std);
            }
            ColumnSummary::Categorical {
                count, unique, freq, ..
            } => known.extend([*count as f64, *unique as f64, *freq as f64]),
            ColumnSummary::Boolean {
                count,
                true_count,
                false_count,
            } => known.extend([*count as f64, *true_count as f64, *false_count as f64]),
        }
    }

    if let Some(matrix) = &analysis.correlation_matrix {
        known.extend(matrix.values.iter().flatten().flatten());
    }
    known
}

/// A quoted figure matches a known one when it equals it at the precision
/// written, or lies within 1% of it.
fn backed_by(value: f64, decimals: i32, known: &[f64]) -> bool {
    let scale = 10f64.powi(decimals);
    known
        .iter()
        .any(|k| (k * scale).round() == (value * scale).round() || (k - value).abs() <= 0.01 * k.abs())
}

fn data_interpretation_criteria(analysis: &AnalysisResult, narrative: &Narrative) -> Vec<Criterion> {
    let terms = data_terms(analysis);
    let narrative_text = std::iter::once(narrative.executive_summary.as_str())
        .chain(narrative.key_findings.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("\n");

    let numeric = analysis.columns_of(ColumnKind::Numeric);
    let correlation_consistent = match &analysis.correlation_matrix {
        None => numeric.len() < 2,
        Some(matrix) => {
            numeric.len() >= 2
                && matrix.columns.len() == numeric.len()
                && matrix.columns.iter().all(|c| numeric.contains(&c.as_str()))
                && matrix
                    .values
                    .iter()
                    .flatten()
                    .flatten()
                    .all(|v| (-1.0..=1.0).contains(v))
        }
    };

    let known = known_values(analysis);
    let figures_backed = quoted_numbers(&analysis.insights)
        .into_iter()
        .chain(quoted_numbers(&narrative_text))
        .all(|(value, decimals)| backed_by(value, decimals, &known));

    vec![
        Criterion::new(
            references_data(&analysis.insights, &terms),
            "insights do not refer to any column of the dataset",
            "Ground the insights in specific columns of the dataset",
        ),
        Criterion::new(
            references_data(&narrative_text, &terms),
            "summary and findings do not refer to the dataset",
            "Tie the summary and key findings to specific columns",
        ),
        Criterion::new(
            correlation_consistent,
            "correlation matrix does not match the numeric columns",
            "Recompute correlations across all numeric columns",
        ),
        Criterion::new(
            figures_backed,
            "quoted figures do not match the computed statistics",
            "Quote figures exactly as they appear in the summary statistics",
        ),
    ]
}

fn visualization_criteria(analysis: &AnalysisResult, visualizations: &VisualizationSet) -> Vec<Criterion> {
    let plottable = !analysis.columns_of(ColumnKind::Numeric).is_empty()
        || !analysis.columns_of(ColumnKind::Categorical).is_empty();

    vec![
        Criterion::new(
            visualizations.plots.iter().all(|p| has_text(&p.title)),
            "some charts have no title",
            "Give every chart a descriptive title",
        ),
        Criterion::new(
            visualizations
                .plots
                .iter()
                .all(|p| serde_json::from_str::<serde_json::Value>(&p.serialized_plot).is_ok()),
            "some chart payloads are not valid figures",
            "Regenerate charts whose figure data is malformed",
        ),
        Criterion::new(
            !plottable || !visualizations.is_empty(),
            "plottable columns have no charts",
            "Add charts for the numeric and categorical columns",
        ),
        Criterion::new(
            visualizations.len() <= 2 * MAX_PLOTTED_COLUMNS + 1,
            "too many charts to read comfortably",
            "Focus on the charts that support the key findings",
        ),
    ]
}

fn narrative_criteria(narrative: &Narrative) -> Vec<Criterion> {
    vec![
        Criterion::new(
            has_text(&narrative.executive_summary),
            "executive summary is missing",
            "Open with a short executive summary",
        ),
        Criterion::new(
            !narrative.key_findings.is_empty(),
            "no key findings listed",
            "List the key findings explicitly",
        ),
        Criterion::new(
            !narrative.business_implications.is_empty(),
            "business implications are missing",
            "Spell out what the findings mean for the business",
        ),
        Criterion::new(
            !narrative.recommendations.is_empty(),
            "no recommendations given",
            "Add concrete, actionable recommendations",
        ),
        Criterion::new(
            !narrative.next_steps.is_empty(),
            "next steps are missing",
            "Close with next steps the reader can take",
        ),
    ]
}

fn check(aspect: QaAspect, criteria: &[Criterion]) -> QualityCheck {
    let score = fraction_met(criteria);
    QualityCheck {
        aspect,
        name: aspect.label().to_string(),
        score,
        passed: criteria.iter().all(|c| c.met),
        issues: criteria
            .iter()
            .filter(|c| !c.met)
            .map(|c| c.issue.to_string())
            .collect(),
    }
}

/// Run the fixed checks and compute scores from them.
///
/// Returns the checks, the computed scores and the suggestions attached to
/// every unmet criterion.
pub fn evaluate(
    analysis: &AnalysisResult,
    visualizations: &VisualizationSet,
    narrative: &Narrative,
) -> (Vec<QualityCheck>, QualityScores, Vec<String>) {
    let data = data_interpretation_criteria(analysis, narrative);
    let charts = visualization_criteria(analysis, visualizations);
    let prose = narrative_criteria(narrative);

    // clarity: charts plus the summary and findings; actionability: the
    // implication, recommendation and next-step sections
    let readable = &prose[..2];
    let actionable = &prose[2..];
    let scores = QualityScores {
        clarity: (fraction_met(&charts) + fraction_met(readable)) / 2.0,
        accuracy: fraction_met(&data),
        actionability: fraction_met(actionable),
    };

    let suggestions = data
        .iter()
        .chain(&charts)
        .chain(&prose)
        .filter(|c| !c.met)
        .map(|c| c.suggestion.to_string())
        .collect();

    let checks = vec![
        check(QaAspect::DataInterpretation, &data),
        check(QaAspect::VisualizationClarity, &charts),
        check(QaAspect::NarrativeQuality, &prose),
    ];

    (checks, scores, suggestions)
}

/// Reviews the assembled artifacts before they are returned.
#[derive(Debug)]
pub struct QaReviewer {
    adapter: AgentAdapter,
    thresholds: QaThresholds,
    scoring: QaScoring,
}

impl QaReviewer {
    pub fn new(adapter: AgentAdapter) -> Self {
        Self {
            adapter,
            thresholds: QaThresholds::default(),
            scoring: QaScoring::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: QaThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_scoring(mut self, scoring: QaScoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn adapter(&self) -> &AgentAdapter {
        &self.adapter
    }

    pub fn thresholds(&self) -> &QaThresholds {
        &self.thresholds
    }

    pub async fn review(
        &self,
        query: &str,
        analysis: &AnalysisResult,
        visualizations: &VisualizationSet,
        narrative: &Narrative,
    ) -> Result<StageOutput<QaReview>> {
        let (checks, computed, mut suggestions) = evaluate(analysis, visualizations, narrative);
        let scores = match self.scoring {
            QaScoring::Computed => computed,
            QaScoring::Fixed(fixed) => fixed,
        };

        let prompt = build_prompt(query, &checks, narrative)?;
        let reply = self.adapter.process(None, &prompt).await?;

        let model_suggestions = match parser::parse_object(&reply.content) {
            Some(map) => parser::string_list(&map, "suggestions"),
            None => parser::text_lines(&reply.content),
        };
        for suggestion in model_suggestions {
            if !suggestions.contains(&suggestion) {
                suggestions.push(suggestion);
            }
        }

        let passes = self.thresholds.passes(&scores);
        debug!(
            clarity = scores.clarity,
            accuracy = scores.accuracy,
            actionability = scores.actionability,
            passes,
            "Quality review complete"
        );

        Ok(StageOutput::new(
            QaReview {
                checks,
                suggestions,
                scores,
                passes,
            },
            reply.tokens_used,
        ))
    }
}

fn build_prompt(query: &str, checks: &[QualityCheck], narrative: &Narrative) -> Result<String> {
    let check_lines: Vec<String> = checks
        .iter()
        .map(|c| {
            if c.issues.is_empty() {
                format!("- {}: passed", c.name)
            } else {
                format!("- {}: {}", c.name, c.issues.join("; "))
            }
        })
        .collect();

    Ok(format!(
        "Review request for the question: {}\n\n\
         Automated checks:\n{}\n\n\
         Narrative under review: {}\n\n\
         Suggest concrete improvements as a JSON object with a suggestions array.",
        query.trim(),
        check_lines.join("\n"),
        serde_json::to_string(narrative)?,
    ))
}
