//! Forest Insight - random-forest training and additive-model explanation summaries
//!
//! This crate provides:
//! - Random-forest regressors and classifiers trained from polars frames
//! - Optional hyperparameter search scored on held-out data
//! - Per-bin summaries of EBM-style global explanations
//! - Band-and-line charts of those summaries
//!
//! # Modules
//!
//! - [`training`] - Decision trees, random forests and the trainers
//! - [`optimizer`] - Search spaces and random hyperparameter search
//! - [`explain`] - Explanation summaries, charts and the bound explainer
//! - [`utils`] - Frame to array conversions

// Core error handling
pub mod error;

pub mod training;
pub mod optimizer;
pub mod explain;

// Utilities
pub mod utils;

pub use error::{InsightError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{InsightError, Result};

    // Training
    pub use crate::training::{
        train_classifier, train_regressor, ClassLabel, ClassWeight, ForestParams, MaxFeatures, RandomForest,
        TaskType, TrainOptions,
    };

    // Optimization
    pub use crate::optimizer::{HyperparameterSearch, RandomSearch, SearchConfig, SearchSpace};

    // Explanation
    pub use crate::explain::{
        plot, summarize, AdditiveExplainer, BoundExplainer, GlobalExplanation, ModelInput,
        PlotOptions, PlotlyRenderer, Summary, SummaryOptions,
    };
}
