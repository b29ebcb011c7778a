//! Forest training module
//!
//! Provides:
//! - Weighted CART decision trees
//! - Random forests with bootstrap row sampling and per-split feature sampling
//! - The regressor/classifier trainers with optional hyperparameter search
//! - Class label encoding for numeric and text targets
//! - Loss metrics used to score search trials

pub mod decision_tree;
pub mod labels;
pub mod metrics;
pub mod params;
pub mod random_forest;
mod trainer;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use labels::{encode_target, encode_with_labels, ClassLabel, EncodedTarget};
pub use metrics::{cross_entropy, rmse};
pub use params::{default_search_space, ClassWeight, ForestParams, MaxFeatures, TaskType, MAX_SAMPLES_CAP};
pub use random_forest::RandomForest;
pub use trainer::{train_classifier, train_regressor, train_with_search, TrainOptions, Validation};
