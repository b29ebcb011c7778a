//! Random Forest implementation

use crate::error::{InsightError, Result};
use super::decision_tree::{Criterion, DecisionTree};
use super::labels::ClassLabel;
use super::params::{ClassWeight, ForestParams, MaxFeatures, TaskType};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at each split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Rows drawn per bootstrap sample (all rows when `None`)
    pub max_samples: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Class weighting (classification only)
    pub class_weight: Option<ClassWeight>,
    /// Worker threads (all cores when `None`)
    pub n_jobs: Option<usize>,
    /// Random state
    pub random_state: Option<u64>,
    task: TaskType,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
    /// Distinct labels seen at fit time (classification)
    classes: Vec<f64>,
    /// Original label behind each entry of `classes`
    #[serde(default)]
    class_labels: Vec<ClassLabel>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_classifier(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            max_samples: None,
            criterion: Criterion::Gini,
            class_weight: None,
            n_jobs: None,
            random_state: None,
            task: TaskType::Classification,
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
            class_labels: Vec::new(),
        }
    }

    /// Create a new regressor forest
    pub fn new_regressor(n_estimators: usize) -> Self {
        Self {
            max_features: MaxFeatures::All,
            criterion: Criterion::MSE,
            task: TaskType::Regression,
            ..Self::new_classifier(n_estimators)
        }
    }

    /// Build an unfitted forest from a parameter set.
    ///
    /// `max_samples` is taken as given; callers clamp it to the row count.
    pub fn from_params(task: TaskType, params: &ForestParams) -> Self {
        let base = match task {
            TaskType::Regression => Self::new_regressor(params.n_estimators),
            TaskType::Classification => Self::new_classifier(params.n_estimators),
        };
        Self {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features,
            bootstrap: params.bootstrap,
            max_samples: Some(params.max_samples),
            criterion: params.criterion.unwrap_or(base.criterion),
            class_weight: params.class_weight.clone(),
            n_jobs: params.n_jobs,
            random_state: params.random_state,
            ..base
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set rows drawn per tree
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    /// Set class weighting
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = Some(class_weight);
        self
    }

    /// Set number of worker threads
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Task this forest was built for
    pub fn task(&self) -> TaskType {
        self.task
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(InsightError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(InsightError::TrainingError(
                "cannot fit a forest on an empty table".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(InsightError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "at least one tree is required".to_string(),
            });
        }

        self.n_features = n_features;

        let (targets, weights): (Array1<f64>, Vec<f64>) = match self.task {
            TaskType::Classification => {
                let mut classes: Vec<f64> = y.to_vec();
                classes.sort_by(|a, b| a.total_cmp(b));
                classes.dedup();

                let encoded: Vec<usize> = y
                    .iter()
                    .map(|v| classes.partition_point(|c| c < v))
                    .collect();
                let weights = self
                    .class_weight
                    .as_ref()
                    .unwrap_or(&ClassWeight::Uniform)
                    .sample_weights(&encoded, &classes);

                self.class_labels = classes.iter().map(|&c| ClassLabel::Number(c)).collect();
                self.classes = classes;
                (encoded.into_iter().map(|c| c as f64).collect(), weights)
            }
            TaskType::Regression => {
                if self.class_weight.is_some() {
                    return Err(InsightError::InvalidParameter {
                        name: "class_weight".to_string(),
                        value: format!("{:?}", self.class_weight),
                        reason: "class weights only apply to classifiers".to_string(),
                    });
                }
                (y.clone(), vec![1.0; n_samples])
            }
        };

        let trees = match self.n_jobs {
            Some(n_jobs) => rayon::ThreadPoolBuilder::new()
                .num_threads(n_jobs)
                .build()?
                .install(|| self.build_trees(x, &targets, &weights)),
            None => self.build_trees(x, &targets, &weights),
        }?;

        debug!(
            n_trees = trees.len(),
            n_samples,
            n_features,
            "Random forest fitted"
        );

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn build_trees(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &[f64],
    ) -> Result<Vec<DecisionTree>> {
        let n_samples = x.nrows();
        let draw = self.max_samples.unwrap_or(n_samples).clamp(1, n_samples);
        let max_features = self.max_features.resolve(x.ncols());
        let base_seed = self.random_state.unwrap_or(42);
        let n_classes = self.classes.len();

        (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..draw).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> = sample_indices.iter().map(|&i| y[i]).collect();
                let w_boot: Vec<f64> = sample_indices.iter().map(|&i| weights[i]).collect();

                let mut tree = match self.task {
                    TaskType::Classification => DecisionTree::new_classifier().with_n_classes(n_classes),
                    TaskType::Regression => DecisionTree::new_regressor(),
                };
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree = tree
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_criterion(self.criterion)
                    .with_random_state(rng.gen());

                tree.fit_weighted(&x_boot, &y_boot, &w_boot)?;
                Ok(tree)
            })
            .collect()
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total_importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (total, &val) in total_importances.iter_mut().zip(imp.iter()) {
                    *total += val;
                }
            }
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total_importances));
    }

    /// Make predictions: mean for regressors, most probable label for classifiers
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self.task {
            TaskType::Regression => {
                if self.trees.is_empty() {
                    return Err(InsightError::ModelNotFitted);
                }
                let all_predictions = self
                    .trees
                    .par_iter()
                    .map(|tree| tree.predict(x))
                    .collect::<Result<Vec<Array1<f64>>>>()?;

                let mut sum = Array1::zeros(x.nrows());
                for preds in &all_predictions {
                    sum += preds;
                }
                Ok(sum / all_predictions.len() as f64)
            }
            TaskType::Classification => {
                let proba = self.predict_proba(x)?;
                Ok(proba
                    .axis_iter(Axis(0))
                    .map(|row| {
                        row.iter()
                            .enumerate()
                            .max_by(|a, b| a.1.total_cmp(b.1))
                            .map(|(idx, _)| self.classes[idx])
                            .unwrap_or(f64::NAN)
                    })
                    .collect())
            }
        }
    }

    /// Predict class probabilities (classification only), columns ordered as [`classes`](Self::classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(InsightError::ModelNotFitted);
        }
        if self.task != TaskType::Classification {
            return Err(InsightError::InvalidInput(
                "predict_proba is only available for classification".to_string(),
            ));
        }

        let all_proba = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<Array2<f64>>>>()?;

        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for p in &all_proba {
            proba += p;
        }
        Ok(proba / all_proba.len() as f64)
    }

    /// Distinct labels in the order used by `predict_proba`
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Original labels, aligned with [`classes`](Self::classes)
    pub fn class_labels(&self) -> &[ClassLabel] {
        &self.class_labels
    }

    /// Replace the labels reported for each class, e.g. the text values a
    /// target was encoded from
    pub fn set_class_labels(&mut self, labels: Vec<ClassLabel>) -> Result<()> {
        if labels.len() != self.classes.len() {
            return Err(InsightError::ShapeError {
                expected: format!("{} class labels", self.classes.len()),
                actual: format!("{} class labels", labels.len()),
            });
        }
        self.class_labels = labels;
        Ok(())
    }

    /// Most probable class per row, as original labels
    pub fn predict_labels(&self, x: &Array2<f64>) -> Result<Vec<ClassLabel>> {
        let proba = self.predict_proba(x)?;
        proba
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .and_then(|(idx, _)| self.class_labels.get(idx).cloned())
                    .ok_or(InsightError::ModelNotFitted)
            })
            .collect()
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Save the fitted forest as JSON
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a forest saved with [`save`](Self::save)
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![3.0, 3.0, 3.0, 7.0, 7.0, 7.0];

        let mut rf = RandomForest::new_classifier(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| p == a)
            .count() as f64
            / y.len() as f64;

        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
        assert_eq!(rf.classes(), &[3.0, 7.0]);
    }

    #[test]
    fn test_class_labels() {
        let x = array![[0.0], [0.1], [0.2], [1.0], [1.1], [1.2]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut rf = RandomForest::new_classifier(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.class_labels(), &[ClassLabel::Number(0.0), ClassLabel::Number(1.0)]);

        rf.set_class_labels(vec!["cat".into(), "dog".into()]).unwrap();
        let labels = rf.predict_labels(&array![[0.05], [1.15]]).unwrap();
        assert_eq!(labels, vec![ClassLabel::from("cat"), ClassLabel::from("dog")]);

        assert!(rf.set_class_labels(vec!["cat".into()]).is_err());
    }

    #[test]
    fn test_regressor() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut rf = RandomForest::new_regressor(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;

        assert!(mse < 2.0, "MSE too high: {}", mse);
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 1.0];

        let mut rf = RandomForest::new_classifier(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (2, 2));
        for i in 0..proba.nrows() {
            let row_sum: f64 = proba.row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-6, "Row {} sum: {}", i, row_sum);
        }
    }

    #[test]
    fn test_dedicated_thread_pool() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut rf = RandomForest::new_regressor(4).with_n_jobs(2).with_random_state(1);
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.n_trees(), 4);
    }

    #[test]
    fn test_same_seed_same_model() {
        let x = array![[1.0, 5.0], [2.0, 3.0], [3.0, 1.0], [4.0, 0.0], [5.0, 2.0]];
        let y = array![1.0, 3.0, 2.0, 5.0, 4.0];

        let mut a = RandomForest::new_regressor(8).with_random_state(7);
        let mut b = RandomForest::new_regressor(8).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_regressor_rejects_class_weight() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0];
        let mut rf = RandomForest::new_regressor(2).with_class_weight(ClassWeight::Balanced);
        assert!(matches!(rf.fit(&x, &y), Err(InsightError::InvalidParameter { .. })));
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 2.0];
        let mut rf = RandomForest::new_regressor(2);
        assert!(matches!(rf.fit(&x, &y), Err(InsightError::ShapeError { .. })));
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut rf = RandomForest::new_regressor(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!(importances[0] >= importances[1]);
    }
}
