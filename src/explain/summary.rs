//! Per-bin explanation summaries for one or several explainers

use crate::error::{InsightError, Result};
use crate::utils::frame::column_values;
use super::binning::{bin_counts, bin_labels};
use super::explainer::{feature_index, AdditiveExplainer};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Label formatting options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Decimal places kept when rendering bin edges
    pub decimal_places: usize,
    /// Render edges as percentages
    pub as_percentage: bool,
    /// Write the last bin as an open-ended `"> x"` label
    pub condense_last_bin: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            decimal_places: 2,
            as_percentage: false,
            condense_last_bin: true,
        }
    }
}

impl SummaryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decimal_places(mut self, dp: usize) -> Self {
        self.decimal_places = dp;
        self
    }

    pub fn with_percentage(mut self, as_percentage: bool) -> Self {
        self.as_percentage = as_percentage;
        self
    }

    pub fn with_condense_last_bin(mut self, condense: bool) -> Self {
        self.condense_last_bin = condense;
        self
    }
}

/// One explainer paired with the table it was trained on, or several such pairs
#[derive(Debug, Clone)]
pub enum ModelInput<'a, E: ?Sized> {
    Single { explainer: &'a E, table: &'a DataFrame },
    Set(Vec<(&'a E, &'a DataFrame)>),
}

impl<'a, E: ?Sized> ModelInput<'a, E> {
    pub fn single(explainer: &'a E, table: &'a DataFrame) -> Self {
        ModelInput::Single { explainer, table }
    }

    pub fn set(models: Vec<(&'a E, &'a DataFrame)>) -> Self {
        ModelInput::Set(models)
    }
}

/// One bin of a single-model summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub effect: f64,
    pub lower: f64,
    pub upper: f64,
    /// Training rows falling in the bin
    pub size: usize,
}

/// Baseline-normalized explanation of one feature, one row per bin label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationSummary {
    pub column: String,
    pub rows: Vec<SummaryRow>,
}

impl ExplanationSummary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.label.clone()).collect()
    }

    pub fn effects(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.effect).collect()
    }

    pub fn lower(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.lower).collect()
    }

    pub fn upper(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.upper).collect()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.size).collect()
    }

    /// Row for a bin label
    pub fn get(&self, label: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Row of a multi-model summary; missing cells come from the outer join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiModelRow {
    pub label: String,
    /// One effect per model, in model order
    pub effects: Vec<Option<f64>>,
    /// Occupancy from the last model
    pub size: Option<usize>,
}

/// Effects of several models joined on bin label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiModelSummary {
    pub column: String,
    /// Model names followed by `"size"`
    pub columns: Vec<String>,
    pub rows: Vec<MultiModelRow>,
}

impl MultiModelSummary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.label.clone()).collect()
    }

    pub fn model_names(&self) -> &[String] {
        &self.columns[..self.columns.len() - 1]
    }

    /// Effect column of the named model
    pub fn effect_column(&self, model: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.model_names().iter().position(|m| m == model)?;
        Some(self.rows.iter().map(|r| r.effects[idx]).collect())
    }

    pub fn sizes(&self) -> Vec<Option<usize>> {
        self.rows.iter().map(|r| r.size).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Output of [`summarize`], matching the shape of the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Summary {
    Single(ExplanationSummary),
    Multi(MultiModelSummary),
}

/// `["Model 0", "Model 1", ...]`
pub fn default_model_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Model {}", i)).collect()
}

/// Supplied names, checked against the model count, or the defaults
pub fn resolve_model_names(n_models: usize, names: Option<&[String]>) -> Result<Vec<String>> {
    match names {
        None => Ok(default_model_names(n_models)),
        Some(names) if names.len() == n_models => Ok(names.to_vec()),
        Some(names) => Err(InsightError::InvalidParameter {
            name: "model_names".to_string(),
            value: format!("{} names", names.len()),
            reason: format!("expected one name per model ({})", n_models),
        }),
    }
}

/// Summarize `column` for a single explainer or a set of explainers
pub fn summarize<E: AdditiveExplainer + ?Sized>(
    input: &ModelInput<'_, E>,
    column: &str,
    model_names: Option<&[String]>,
    options: &SummaryOptions,
) -> Result<Summary> {
    match input {
        ModelInput::Single { explainer, table } => {
            summarize_single(*explainer, table, column, options).map(Summary::Single)
        }
        ModelInput::Set(models) => summarize_set(models, column, model_names, options).map(Summary::Multi),
    }
}

/// Summary of one explainer: bins labelled, deduplicated by label (last wins),
/// and shifted so the first bin's effect is zero.
pub fn summarize_single<E: AdditiveExplainer + ?Sized>(
    explainer: &E,
    table: &DataFrame,
    column: &str,
    options: &SummaryOptions,
) -> Result<ExplanationSummary> {
    let index = feature_index(explainer, column)?;
    let term = explainer.term(index)?;
    term.validate()?;

    let values = column_values(table, column)?;
    let counts = bin_counts(&values, &term.bin_edges);
    let labels = bin_labels(
        &term.bin_edges,
        options.decimal_places,
        options.as_percentage,
        options.condense_last_bin,
    );

    let last_position: HashMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();

    let mut rows: Vec<SummaryRow> = labels
        .iter()
        .enumerate()
        .filter(|(i, label)| last_position[label.as_str()] == *i)
        .map(|(i, label)| SummaryRow {
            label: label.clone(),
            effect: term.scores[i],
            lower: term.lower_bounds[i],
            upper: term.upper_bounds[i],
            size: counts[i],
        })
        .collect();

    let adjust = -rows[0].effect;
    for row in &mut rows {
        row.effect += adjust;
        row.lower += adjust;
        row.upper += adjust;
    }

    debug!(
        column,
        n_bins = term.n_bins(),
        n_rows = rows.len(),
        "Summarized explanation"
    );

    Ok(ExplanationSummary {
        column: column.to_string(),
        rows,
    })
}

/// Outer join of per-model effects on bin label, plus the last model's sizes
pub fn summarize_set<E: AdditiveExplainer + ?Sized>(
    models: &[(&E, &DataFrame)],
    column: &str,
    model_names: Option<&[String]>,
    options: &SummaryOptions,
) -> Result<MultiModelSummary> {
    if models.is_empty() {
        return Err(InsightError::InvalidInput(
            "at least one model is required".to_string(),
        ));
    }
    let names = resolve_model_names(models.len(), model_names)?;
    let n_models = models.len();

    let mut rows: Vec<MultiModelRow> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (model_idx, (explainer, table)) in models.iter().enumerate() {
        let summary = summarize_single(*explainer, table, column, options)?;
        let is_last = model_idx == n_models - 1;

        for row in summary.rows {
            let pos = *positions.entry(row.label.clone()).or_insert_with(|| {
                rows.push(MultiModelRow {
                    label: row.label.clone(),
                    effects: vec![None; n_models],
                    size: None,
                });
                rows.len() - 1
            });
            rows[pos].effects[model_idx] = Some(row.effect);
            if is_last {
                rows[pos].size = Some(row.size);
            }
        }
    }

    let mut columns = names;
    columns.push("size".to_string());

    Ok(MultiModelSummary {
        column: column.to_string(),
        columns,
        rows,
    })
}
