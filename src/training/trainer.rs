//! Forest trainer: direct fits and tuned fits

use crate::error::Result;
use crate::optimizer::{HyperparameterSearch, RandomSearch, SearchConfig, SearchSpace, TrialParams};
use crate::utils::frame::{features_to_array2, series_to_array1};
use super::labels::{encode_target, encode_with_labels, ClassLabel};
use super::metrics::{cross_entropy, rmse};
use super::params::{default_search_space, ClassWeight, ForestParams, TaskType};
use super::random_forest::RandomForest;
use ndarray::{Array1, Array2};
use polars::prelude::{DataFrame, Series};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Options shared by [`train_regressor`] and [`train_classifier`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOptions {
    /// Search hyperparameters before the final fit
    pub hypertune: bool,
    /// Maximum number of search evaluations
    pub search_budget: usize,
    /// Tunable parameter ranges
    pub search_space: SearchSpace,
    /// Settings for the default random search
    pub search: SearchConfig,
    /// Parameters for the direct (untuned) fit
    pub params: ForestParams,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            hypertune: false,
            search_budget: 100,
            search_space: default_search_space(),
            search: SearchConfig::default(),
            params: ForestParams::default(),
        }
    }
}

impl TrainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable hyperparameter search with the given evaluation budget
    pub fn with_hypertune(mut self, search_budget: usize) -> Self {
        self.hypertune = true;
        self.search_budget = search_budget;
        self
    }

    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.search_space = space;
        self
    }

    pub fn with_search_config(mut self, config: SearchConfig) -> Self {
        self.search = config;
        self
    }

    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }
}

/// Optional held-out rows used to score search trials
pub type Validation<'a> = Option<(&'a DataFrame, &'a Series)>;

/// Train a random-forest regressor
pub fn train_regressor(
    features: &DataFrame,
    target: &Series,
    validation: Validation<'_>,
    options: &TrainOptions,
) -> Result<RandomForest> {
    let search = RandomSearch::new(options.search.clone());
    train_with_search(TaskType::Regression, features, target, validation, options, &search)
}

/// Train a random-forest classifier with balanced class weights unless overridden
pub fn train_classifier(
    features: &DataFrame,
    target: &Series,
    validation: Validation<'_>,
    options: &TrainOptions,
) -> Result<RandomForest> {
    let search = RandomSearch::new(options.search.clone());
    train_with_search(TaskType::Classification, features, target, validation, options, &search)
}

/// Train with a caller-supplied search routine.
///
/// Without `hypertune` this is a single fit with `options.params`. With it,
/// `search` picks the best trial parameters and one more fit is made from
/// estimator defaults overlaid with them; `options.params` is not consulted.
pub fn train_with_search<S: HyperparameterSearch>(
    task: TaskType,
    features: &DataFrame,
    target: &Series,
    validation: Validation<'_>,
    options: &TrainOptions,
    search: &S,
) -> Result<RandomForest> {
    let x = features_to_array2(features)?;
    let (y, labels) = match task {
        TaskType::Regression => (series_to_array1(target)?, None),
        TaskType::Classification => {
            let encoded = encode_target(target)?;
            (encoded.values, Some(encoded.labels))
        }
    };

    if !options.hypertune {
        let model = fit_forest(task, &x, &y, options.params.clone())?;
        return with_labels(model, labels);
    }

    let (x_val, y_val) = match validation {
        Some((val_features, val_target)) => (
            features_to_array2(val_features)?,
            match &labels {
                Some(labels) => encode_with_labels(val_target, labels)?,
                None => series_to_array1(val_target)?,
            },
        ),
        None => {
            debug!("No validation data supplied, scoring trials on the training rows");
            (x.clone(), y.clone())
        }
    };

    let objective = |trial: &TrialParams| -> Result<f64> {
        let params = ForestParams::estimator_defaults(task).apply_trial(trial)?;
        let model = fit_forest(task, &x, &y, params)?;
        loss(task, &model, &x_val, &y_val)
    };

    let best = search.minimize(&options.search_space, options.search_budget, &objective)?;
    info!(?best, "Refitting forest with best hyperparameters");

    let params = ForestParams::estimator_defaults(task).apply_trial(&best)?;
    let model = fit_forest(task, &x, &y, params)?;
    with_labels(model, labels)
}

fn with_labels(mut model: RandomForest, labels: Option<Vec<ClassLabel>>) -> Result<RandomForest> {
    if let Some(labels) = labels {
        model.set_class_labels(labels)?;
    }
    Ok(model)
}

/// Single estimator fit: clamps `max_samples` to the row count and applies
/// the classifier's balanced default.
fn fit_forest(
    task: TaskType,
    x: &Array2<f64>,
    y: &Array1<f64>,
    mut params: ForestParams,
) -> Result<RandomForest> {
    params.max_samples = params.max_samples.min(x.nrows());
    if task == TaskType::Classification && params.class_weight.is_none() {
        params.class_weight = Some(ClassWeight::Balanced);
    }

    let mut model = RandomForest::from_params(task, &params);
    model.fit(x, y)?;
    Ok(model)
}

fn loss(task: TaskType, model: &RandomForest, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
    match task {
        TaskType::Regression => Ok(rmse(y, &model.predict(x)?)),
        TaskType::Classification => Ok(cross_entropy(y, &model.predict_proba(x)?, model.classes())),
    }
}
