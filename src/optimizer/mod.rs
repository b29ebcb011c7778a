//! Hyperparameter search
//!
//! Provides the search space description, the [`HyperparameterSearch`]
//! collaborator trait used by the forest trainer, and a seeded
//! [`RandomSearch`] implementation.

mod config;
mod search;
mod search_space;

pub use config::SearchConfig;
pub use search::{HyperparameterSearch, Objective, RandomSearch, Study, TrialResult};
pub use search_space::{Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
