//! Forest hyperparameters and the default tuning search space

use crate::error::{InsightError, Result};
use crate::optimizer::{ParameterValue, SearchSpace, TrialParams};
use super::decision_tree::Criterion;
use serde::{Deserialize, Serialize};

/// Upper bound on rows drawn per bootstrap sample
pub const MAX_SAMPLES_CAP: usize = 200_000;

/// Kind of estimator being trained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Regression,
    Classification,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Number of features drawn per split for a table with `n_features` columns
    pub fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Per-class sample weighting for classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassWeight {
    /// Weight classes inversely to their frequency: `n_samples / (n_classes * count)`
    Balanced,
    /// Every sample weighs 1
    Uniform,
    /// Explicit `(label, weight)` pairs; unlisted labels weigh 1
    Custom(Vec<(f64, f64)>),
}

impl ClassWeight {
    /// Per-sample weights for class-index encoded labels
    pub fn sample_weights(&self, encoded: &[usize], classes: &[f64]) -> Vec<f64> {
        match self {
            ClassWeight::Uniform => vec![1.0; encoded.len()],
            ClassWeight::Balanced => {
                let mut counts = vec![0usize; classes.len()];
                for &c in encoded {
                    counts[c] += 1;
                }
                let n = encoded.len() as f64;
                let k = classes.len() as f64;
                encoded
                    .iter()
                    .map(|&c| n / (k * counts[c] as f64))
                    .collect()
            }
            ClassWeight::Custom(pairs) => {
                let per_class: Vec<f64> = classes
                    .iter()
                    .map(|label| {
                        pairs
                            .iter()
                            .find(|(l, _)| l == label)
                            .map_or(1.0, |(_, w)| *w)
                    })
                    .collect();
                encoded.iter().map(|&c| per_class[c]).collect()
            }
        }
    }
}

/// Forest hyperparameters.
///
/// The defaults are the trainer's headline settings; every other field is
/// handed to the estimator untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_features: MaxFeatures,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
    pub bootstrap: bool,
    /// Impurity criterion; task default when `None`
    pub criterion: Option<Criterion>,
    /// Cap on rows drawn per tree, clamped to the row count at fit time
    pub max_samples: usize,
    /// Class weighting; `Balanced` for classifiers when `None`
    pub class_weight: Option<ClassWeight>,
    /// Worker threads; all available cores when `None`
    pub n_jobs: Option<usize>,
    pub random_state: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 40,
            max_features: MaxFeatures::Fraction(0.5),
            min_samples_leaf: 5,
            min_samples_split: 2,
            max_depth: None,
            bootstrap: true,
            criterion: None,
            max_samples: MAX_SAMPLES_CAP,
            class_weight: None,
            n_jobs: None,
            random_state: None,
        }
    }
}

impl ForestParams {
    /// Plain estimator defaults, used as the base for tuned fits
    pub fn estimator_defaults(task: TaskType) -> Self {
        Self {
            n_estimators: 100,
            max_features: match task {
                TaskType::Regression => MaxFeatures::All,
                TaskType::Classification => MaxFeatures::Sqrt,
            },
            min_samples_leaf: 1,
            ..Self::default()
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = Some(class_weight);
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Overlay sampled trial values onto these parameters
    pub fn apply_trial(mut self, trial: &TrialParams) -> Result<Self> {
        for (name, value) in trial {
            match name.as_str() {
                "n_estimators" => self.n_estimators = positive_int(name, value)?,
                "min_samples_leaf" => self.min_samples_leaf = positive_int(name, value)?,
                "min_samples_split" => self.min_samples_split = positive_int(name, value)?.max(2),
                "max_depth" => self.max_depth = Some(positive_int(name, value)?),
                "max_features" => self.max_features = max_features_value(value)?,
                "bootstrap" => {
                    self.bootstrap = value
                        .as_bool()
                        .ok_or_else(|| invalid(name, value, "expected a boolean"))?
                }
                _ => return Err(invalid(name, value, "not a forest hyperparameter")),
            }
        }
        Ok(self)
    }
}

/// Search space explored when tuning is requested without an explicit space
pub fn default_search_space() -> SearchSpace {
    SearchSpace::new()
        .int("n_estimators", 10, 200)
        .int("max_depth", 2, 20)
        .float("max_features", 0.1, 1.0)
        .int("min_samples_leaf", 1, 25)
}

fn positive_int(name: &str, value: &ParameterValue) -> Result<usize> {
    match value.as_int() {
        Some(v) if v >= 1 => Ok(v as usize),
        _ => Err(invalid(name, value, "expected a positive integer")),
    }
}

fn max_features_value(value: &ParameterValue) -> Result<MaxFeatures> {
    match value {
        ParameterValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
        ParameterValue::Int(n) if *n >= 1 => Ok(MaxFeatures::Fixed(*n as usize)),
        ParameterValue::String(s) => match s.as_str() {
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            "all" => Ok(MaxFeatures::All),
            _ => Err(invalid("max_features", value, "unknown strategy")),
        },
        _ => Err(invalid("max_features", value, "expected a fraction in (0, 1]")),
    }
}

fn invalid(name: &str, value: &ParameterValue, reason: &str) -> InsightError {
    InsightError::InvalidParameter {
        name: name.to_string(),
        value: format!("{:?}", value),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_params() {
        let params = ForestParams::default();
        assert_eq!(params.n_estimators, 40);
        assert_eq!(params.max_features, MaxFeatures::Fraction(0.5));
        assert_eq!(params.min_samples_leaf, 5);
        assert_eq!(params.max_samples, 200_000);
        assert!(params.class_weight.is_none());
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(10), 5);
        assert_eq!(MaxFeatures::Sqrt.resolve(16), 4);
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(10), 1);
        assert_eq!(MaxFeatures::Fixed(20).resolve(3), 3);
    }

    #[test]
    fn test_balanced_weights() {
        let classes = vec![0.0, 1.0];
        let encoded = vec![0, 0, 0, 1];
        let weights = ClassWeight::Balanced.sample_weights(&encoded, &classes);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[3] - 2.0).abs() < 1e-12);
        let total: f64 = weights.iter().sum();
        assert!((total - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_weights() {
        let classes = vec![1.0, 2.0];
        let weights = ClassWeight::Custom(vec![(2.0, 3.0)]).sample_weights(&[0, 1], &classes);
        assert_eq!(weights, vec![1.0, 3.0]);
    }

    #[test]
    fn test_apply_trial_ignores_headline_defaults() {
        let mut trial: TrialParams = HashMap::new();
        trial.insert("max_depth".to_string(), ParameterValue::Int(4));
        let params = ForestParams::estimator_defaults(TaskType::Regression)
            .apply_trial(&trial)
            .unwrap();
        assert_eq!(params.n_estimators, 100);
        assert_eq!(params.min_samples_leaf, 1);
        assert_eq!(params.max_depth, Some(4));
    }

    #[test]
    fn test_apply_trial_rejects_unknown() {
        let mut trial: TrialParams = HashMap::new();
        trial.insert("learning_rate".to_string(), ParameterValue::Float(0.1));
        let err = ForestParams::default().apply_trial(&trial).unwrap_err();
        assert!(matches!(err, InsightError::InvalidParameter { .. }));
    }

    #[test]
    fn test_default_search_space() {
        let space = default_search_space();
        assert_eq!(space.len(), 4);
        assert!(space.get("max_features").is_some());
        assert!(space.validate().is_ok());
    }
}
