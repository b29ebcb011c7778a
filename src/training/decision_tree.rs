//! Weighted CART decision tree used as the forest base learner

use crate::error::{InsightError, Result};
use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        /// Normalized class distribution (empty for regression)
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        gain: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    MSE,
}

/// Decision tree model
///
/// Classification trees expect labels encoded as class indices `0..n_classes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Number of features drawn at each split (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature subsampling
    pub random_state: u64,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
    is_classification: bool,
}

/// Weighted sufficient statistics of a node
#[derive(Debug, Clone)]
struct NodeStats {
    weight: f64,
    sum: f64,
    sq_sum: f64,
    class_weights: Vec<f64>,
}

impl NodeStats {
    fn new(n_classes: usize) -> Self {
        Self {
            weight: 0.0,
            sum: 0.0,
            sq_sum: 0.0,
            class_weights: vec![0.0; n_classes],
        }
    }

    fn add(&mut self, y: f64, w: f64, classification: bool) {
        self.weight += w;
        if classification {
            self.class_weights[y as usize] += w;
        } else {
            self.sum += w * y;
            self.sq_sum += w * y * y;
        }
    }

    fn remove(&mut self, y: f64, w: f64, classification: bool) {
        self.weight -= w;
        if classification {
            self.class_weights[y as usize] -= w;
        } else {
            self.sum -= w * y;
            self.sq_sum -= w * y * y;
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_weights
                    .iter()
                    .map(|&c| (c / self.weight).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -self
                .class_weights
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / self.weight;
                    p * p.ln()
                })
                .sum::<f64>(),
            Criterion::MSE => {
                // Var = E[X²] - E[X]²
                let mean = self.sum / self.weight;
                (self.sq_sum / self.weight - mean * mean).max(0.0)
            }
        }
    }
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: 42,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
            is_classification: true,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set number of features drawn per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fix the number of classes (needed when a bootstrap sample misses a class)
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Fit the tree with unit sample weights
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let weights = vec![1.0; y.len()];
        self.fit_weighted(x, y, &weights)
    }

    /// Fit the tree with per-sample weights
    pub fn fit_weighted(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: &[f64],
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() || n_samples != sample_weight.len() {
            return Err(InsightError::ShapeError {
                expected: format!("y and weights length = {}", n_samples),
                actual: format!("y length = {}, weights length = {}", y.len(), sample_weight.len()),
            });
        }

        if n_samples == 0 {
            return Err(InsightError::TrainingError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }

        if self.is_classification {
            if y.iter().any(|&v| v < 0.0 || v.fract() != 0.0) {
                return Err(InsightError::TrainingError(
                    "classification labels must be non-negative class indices".to_string(),
                ));
            }
            let max_label = y.iter().fold(0.0f64, |m, &v| m.max(v)) as usize;
            self.n_classes = self.n_classes.max(max_label + 1);
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);

        let indices: Vec<usize> = (0..n_samples).collect();
        let root = self.build_tree(x, y, sample_weight, &indices, 0, &mut importances, &mut rng);
        self.root = Some(root);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn node_stats(&self, y: &Array1<f64>, w: &[f64], indices: &[usize]) -> NodeStats {
        let mut stats = NodeStats::new(self.n_classes);
        for &i in indices {
            stats.add(y[i], w[i], self.is_classification);
        }
        stats
    }

    #[allow(clippy::too_many_arguments)]
    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        w: &[f64],
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = self.node_stats(y, w, indices);
        let parent_impurity = stats.impurity(self.criterion);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || parent_impurity <= 1e-12;

        if should_stop {
            return self.make_leaf(&stats, n_samples);
        }

        let n_try = self.max_features.unwrap_or(self.n_features).min(self.n_features);
        let candidates = sample(rng, self.n_features, n_try).into_vec();

        match self.find_best_split(x, y, w, indices, &candidates, &stats, parent_impurity) {
            Some((feature_idx, threshold, gain)) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                importances[feature_idx] += stats.weight * gain;

                let left = Box::new(self.build_tree(x, y, w, &left_indices, depth + 1, importances, rng));
                let right = Box::new(self.build_tree(x, y, w, &right_indices, depth + 1, importances, rng));

                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    n_samples,
                    gain,
                }
            }
            None => self.make_leaf(&stats, n_samples),
        }
    }

    /// Sweep each candidate feature once in sorted order and keep the best gain.
    #[allow(clippy::too_many_arguments)]
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        w: &[f64],
        indices: &[usize],
        candidates: &[usize],
        parent: &NodeStats,
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let classification = self.is_classification;

        candidates
            .par_iter()
            .filter_map(|&feature_idx| {
                let mut order = indices.to_vec();
                order.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

                let mut left = NodeStats::new(self.n_classes);
                let mut right = parent.clone();
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..n - 1 {
                    let i = order[pos];
                    left.add(y[i], w[i], classification);
                    right.remove(y[i], w[i], classification);

                    let n_left = pos + 1;
                    if n_left < self.min_samples_leaf || n - n_left < self.min_samples_leaf {
                        continue;
                    }

                    let current = x[[i, feature_idx]];
                    let next = x[[order[pos + 1], feature_idx]];
                    if next <= current {
                        continue;
                    }
                    if left.weight <= 0.0 || right.weight <= 0.0 {
                        continue;
                    }

                    let weighted = (left.weight * left.impurity(self.criterion)
                        + right.weight * right.impurity(self.criterion))
                        / parent.weight;
                    let gain = parent_impurity - weighted;

                    if gain > best.map_or(1e-12, |(g, _)| g) {
                        best = Some((gain, (current + next) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .max_by(|a, b| a.2.total_cmp(&b.2))
    }

    fn make_leaf(&self, stats: &NodeStats, n_samples: usize) -> TreeNode {
        if self.is_classification {
            let distribution: Vec<f64> = if stats.weight > 0.0 {
                stats.class_weights.iter().map(|&c| c / stats.weight).collect()
            } else {
                vec![0.0; self.n_classes]
            };
            let value = distribution
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(class, _)| class as f64)
                .unwrap_or(0.0);
            TreeNode::Leaf {
                value,
                distribution,
                n_samples,
            }
        } else {
            let value = if stats.weight > 0.0 {
                stats.sum / stats.weight
            } else {
                0.0
            };
            TreeNode::Leaf {
                value,
                distribution: Vec::new(),
                n_samples,
            }
        }
    }

    /// Walk to the leaf for `row`, returning its value and class distribution.
    fn leaf_for<'a>(&'a self, node: &'a TreeNode, x: &Array2<f64>, row: usize) -> (f64, &'a [f64]) {
        match node {
            TreeNode::Leaf {
                value, distribution, ..
            } => (*value, distribution),
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if x[[row, *feature_idx]] <= *threshold {
                    self.leaf_for(left, x, row)
                } else {
                    self.leaf_for(right, x, row)
                }
            }
        }
    }

    /// Make predictions (class index for classifiers, mean for regressors)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(InsightError::ModelNotFitted)?;
        self.check_features(x)?;

        Ok((0..x.nrows())
            .map(|i| self.leaf_for(root, x, i).0)
            .collect())
    }

    /// Class distributions for each row (classification only)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(InsightError::ModelNotFitted)?;
        if !self.is_classification {
            return Err(InsightError::InvalidInput(
                "predict_proba is only available for classification".to_string(),
            ));
        }
        self.check_features(x)?;

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for i in 0..x.nrows() {
            let (_, distribution) = self.leaf_for(root, x, i);
            for (j, &p) in distribution.iter().enumerate() {
                proba[[i, j]] = p;
            }
        }
        Ok(proba)
    }

    fn check_features(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(InsightError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;

        assert!(mse < 1e-9, "MSE too high: {}", mse);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_min_samples_leaf_limits_leaves() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let mut tree = DecisionTree::new_regressor().with_min_samples_leaf(3);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_weights_shift_majority() {
        // A single node (depth 0) predicts the weighted majority class
        let x = array![[0.0], [0.0], [0.0]];
        let y = array![0.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit_weighted(&x, &y, &[1.0, 1.0, 5.0]).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        assert!((proba[[0, 1]] - 5.0 / 7.0).abs() < 1e-12);
        assert_eq!(tree.predict(&x).unwrap()[0], 1.0);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_rejects_fractional_labels() {
        let x = array![[0.0], [1.0]];
        let y = array![0.5, 1.0];
        let mut tree = DecisionTree::new_classifier();
        assert!(tree.fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new_regressor();
        let x = array![[1.0]];
        assert!(matches!(tree.predict(&x), Err(InsightError::ModelNotFitted)));
    }
}
