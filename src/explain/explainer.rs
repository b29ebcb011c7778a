//! Additive explainer interface and a serializable global explanation

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};

/// Per-bin explanation of one feature.
///
/// `bin_edges` has one more entry than the per-bin vectors: bin `i` spans
/// `bin_edges[i]..=bin_edges[i + 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermExplanation {
    pub bin_edges: Vec<f64>,
    pub scores: Vec<f64>,
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
}

impl TermExplanation {
    /// Number of bins
    pub fn n_bins(&self) -> usize {
        self.scores.len()
    }

    /// Check that edges and per-bin vectors line up and edges ascend strictly
    pub fn validate(&self) -> Result<()> {
        let n = self.scores.len();
        if n == 0 {
            return Err(InsightError::DataError("explanation has no bins".to_string()));
        }
        if self.bin_edges.len() != n + 1 {
            return Err(InsightError::ShapeError {
                expected: format!("{} bin edges", n + 1),
                actual: format!("{} bin edges", self.bin_edges.len()),
            });
        }
        if self.lower_bounds.len() != n || self.upper_bounds.len() != n {
            return Err(InsightError::ShapeError {
                expected: format!("{} lower and upper bounds", n),
                actual: format!(
                    "{} lower, {} upper",
                    self.lower_bounds.len(),
                    self.upper_bounds.len()
                ),
            });
        }
        if self.bin_edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(InsightError::DataError(
                "bin edges must increase monotonically".to_string(),
            ));
        }
        Ok(())
    }
}

/// A fitted additive model that exposes a global per-feature explanation
pub trait AdditiveExplainer {
    /// Feature names in the explainer's own order
    fn feature_names(&self) -> &[String];

    /// Explanation of the feature at `index`
    fn term(&self, index: usize) -> Result<TermExplanation>;
}

impl<E: AdditiveExplainer + ?Sized> AdditiveExplainer for &E {
    fn feature_names(&self) -> &[String] {
        (**self).feature_names()
    }

    fn term(&self, index: usize) -> Result<TermExplanation> {
        (**self).term(index)
    }
}

/// Position of `column` among the explainer's feature names
pub fn feature_index<E: AdditiveExplainer + ?Sized>(explainer: &E, column: &str) -> Result<usize> {
    explainer
        .feature_names()
        .iter()
        .position(|name| name == column)
        .ok_or_else(|| InsightError::FeatureNotFound(column.to_string()))
}

/// Global explanation exported from an additive model.
///
/// The JSON layout is `{"feature_names": [...], "terms": [{"bin_edges": ...,
/// "scores": ..., "lower_bounds": ..., "upper_bounds": ...}, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalExplanation {
    feature_names: Vec<String>,
    terms: Vec<TermExplanation>,
}

impl GlobalExplanation {
    /// Create a global explanation; one term per feature name
    pub fn new(feature_names: Vec<String>, terms: Vec<TermExplanation>) -> Result<Self> {
        if feature_names.len() != terms.len() {
            return Err(InsightError::ShapeError {
                expected: format!("{} terms", feature_names.len()),
                actual: format!("{} terms", terms.len()),
            });
        }
        Ok(Self {
            feature_names,
            terms,
        })
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        Self::new(parsed.feature_names, parsed.terms)
    }

    /// Load from a JSON file
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl AdditiveExplainer for GlobalExplanation {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn term(&self, index: usize) -> Result<TermExplanation> {
        self.terms
            .get(index)
            .cloned()
            .ok_or_else(|| InsightError::FeatureNotFound(format!("term {}", index)))
    }
}
