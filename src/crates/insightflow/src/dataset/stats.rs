//! Descriptive statistics over a [`TabularDataset`].

use super::table::{Cell, Column, ColumnKind, TabularDataset};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-column summary, shaped after the usual `describe()` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSummary {
    Numeric {
        count: usize,
        mean: f64,
        /// Sample standard deviation; absent with fewer than two values.
        std: Option<f64>,
        min: f64,
        #[serde(rename = "25%")]
        p25: f64,
        #[serde(rename = "50%")]
        p50: f64,
        #[serde(rename = "75%")]
        p75: f64,
        max: f64,
    },
    Categorical {
        count: usize,
        unique: usize,
        top: Option<String>,
        freq: usize,
    },
    Boolean {
        count: usize,
        true_count: usize,
        false_count: usize,
    },
}

/// Pairwise Pearson correlations between numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major; `None` where a correlation is undefined.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// Whether at least one off-diagonal correlation is defined.
    pub fn has_values(&self) -> bool {
        self.values.iter().enumerate().any(|(i, row)| {
            row.iter()
                .enumerate()
                .any(|(j, v)| i != j && v.is_some())
        })
    }
}

/// Occurrences of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Summaries for every column.
pub fn describe(table: &TabularDataset) -> BTreeMap<String, ColumnSummary> {
    table
        .columns()
        .iter()
        .map(|column| (column.name().to_string(), summarize(column)))
        .collect()
}

/// Null count per column.
pub fn missing_values(table: &TabularDataset) -> BTreeMap<String, usize> {
    table
        .columns()
        .iter()
        .map(|column| (column.name().to_string(), column.null_count()))
        .collect()
}

/// Correlation matrix over numeric columns, when there are at least two.
pub fn correlation(table: &TabularDataset) -> Option<CorrelationMatrix> {
    let numeric = table.numeric_columns();
    if numeric.len() < 2 {
        return None;
    }

    let series: Vec<Vec<Option<f64>>> = numeric.iter().map(|c| c.numeric_cells()).collect();
    let values = series
        .iter()
        .map(|x| series.iter().map(|y| pearson(x, y)).collect())
        .collect();

    Some(CorrelationMatrix {
        columns: numeric.iter().map(|c| c.name().to_string()).collect(),
        values,
    })
}

/// Category frequencies, most common first; ties keep first-seen order.
pub fn value_counts(column: &Column) -> Vec<ValueCount> {
    let mut order: Vec<ValueCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for label in column.cells().iter().filter_map(Cell::label) {
        match index.get(&label) {
            Some(&i) => order[i].count += 1,
            None => {
                index.insert(label.clone(), order.len());
                order.push(ValueCount {
                    value: label,
                    count: 1,
                });
            }
        }
    }

    order.sort_by(|a, b| b.count.cmp(&a.count));
    order
}

fn summarize(column: &Column) -> ColumnSummary {
    match column.kind() {
        ColumnKind::Numeric => numeric_summary(&column.numeric_values()),
        ColumnKind::Boolean => {
            let true_count = column
                .cells()
                .iter()
                .filter(|c| matches!(c, Cell::Bool(true)))
                .count();
            let count = column.count();
            ColumnSummary::Boolean {
                count,
                true_count,
                false_count: count - true_count,
            }
        }
        ColumnKind::Categorical => {
            let counts = value_counts(column);
            let (top, freq) = counts
                .first()
                .map(|vc| (Some(vc.value.clone()), vc.count))
                .unwrap_or((None, 0));
            ColumnSummary::Categorical {
                count: column.count(),
                unique: counts.len(),
                top,
                freq,
            }
        }
    }
}

// Numeric columns always hold at least one value.
fn numeric_summary(values: &[f64]) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        Some(var.sqrt())
    } else {
        None
    };

    ColumnSummary::Numeric {
        count,
        mean,
        std,
        min: sorted[0],
        p25: quantile(&sorted, 0.25),
        p50: quantile(&sorted, 0.5),
        p75: quantile(&sorted, 0.75),
        max: sorted[count - 1],
    }
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Pearson correlation over rows where both values are present.
fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
