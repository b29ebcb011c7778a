//! Hyperparameter search: the collaborator trait and a random-search implementation

use crate::error::{InsightError, Result};
use super::config::SearchConfig;
use super::search_space::{SearchSpace, TrialParams};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Objective evaluated for each sampled configuration; lower is better
pub type Objective<'a> = dyn Fn(&TrialParams) -> Result<f64> + Sync + 'a;

/// A routine that, given a search space, an evaluation budget and an objective,
/// returns the best parameter mapping it found.
pub trait HyperparameterSearch {
    fn minimize(&self, space: &SearchSpace, budget: usize, objective: &Objective<'_>) -> Result<TrialParams>;
}

/// One evaluated configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: usize,
    pub params: TrialParams,
    /// Objective value, `f64::INFINITY` when the objective failed
    pub value: f64,
    pub duration_secs: f64,
    pub failed: bool,
}

/// All trials of one search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    pub trials: Vec<TrialResult>,
    /// Index of the lowest successful trial
    pub best_trial_idx: Option<usize>,
    pub total_duration_secs: f64,
}

impl Study {
    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.and_then(|idx| self.trials.get(idx))
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_trial().map(|t| t.value)
    }

    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    /// Record a trial, tracking the best successful one
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();
        let is_better = match self.best_value() {
            None => true,
            Some(best) => result.value < best,
        };

        if is_better && !result.failed {
            self.best_trial_idx = Some(idx);
        }

        self.trials.push(result);
    }
}

/// Uniform random search over a [`SearchSpace`]
#[derive(Debug, Clone, Default)]
pub struct RandomSearch {
    config: SearchConfig,
}

impl RandomSearch {
    /// Create a new random search
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Run the search and return every trial
    pub fn run(&self, space: &SearchSpace, budget: usize, objective: &Objective<'_>) -> Study {
        let start = Instant::now();
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut study = Study::default();
        let mut trials_without_improvement = 0;

        for trial_id in 0..budget {
            if let Some(p) = self.config.early_stopping_patience {
                if trials_without_improvement >= p {
                    debug!(trial_id, patience = p, "Early stopping search");
                    break;
                }
            }

            let trial_start = Instant::now();
            let params = space.sample(&mut rng);

            let result = match objective(&params) {
                Ok(value) => {
                    let is_improvement = study
                        .best_value()
                        .map_or(true, |best| value < best - self.config.min_improvement);
                    if is_improvement {
                        trials_without_improvement = 0;
                    } else {
                        trials_without_improvement += 1;
                    }

                    TrialResult {
                        trial_id,
                        params,
                        value,
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        failed: false,
                    }
                }
                Err(e) => {
                    warn!(trial_id, error = %e, "Trial failed, scoring as worst");
                    trials_without_improvement += 1;
                    TrialResult {
                        trial_id,
                        params,
                        value: f64::INFINITY,
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        failed: true,
                    }
                }
            };

            debug!(trial_id, value = result.value, "Trial finished");
            study.add_trial(result);
        }

        study.total_duration_secs = start.elapsed().as_secs_f64();
        study
    }
}

impl HyperparameterSearch for RandomSearch {
    fn minimize(&self, space: &SearchSpace, budget: usize, objective: &Objective<'_>) -> Result<TrialParams> {
        space.validate()?;
        let study = self.run(space, budget, objective);
        let best = study.best_trial().ok_or_else(|| {
            InsightError::OptimizationError(format!(
                "no successful trial in {} evaluations",
                study.trials.len()
            ))
        })?;

        info!(
            n_trials = study.trials.len(),
            best_value = best.value,
            duration_secs = study.total_duration_secs,
            "Hyperparameter search finished"
        );
        Ok(best.params.clone())
    }
}
