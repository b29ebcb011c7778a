//! Search configuration

use serde::{Deserialize, Serialize};

/// Configuration for the random-search collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Random seed for parameter sampling
    pub random_state: Option<u64>,

    /// Patience for early stopping (trials without improvement)
    pub early_stopping_patience: Option<usize>,

    /// Minimum improvement to reset patience
    pub min_improvement: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            random_state: Some(42),
            early_stopping_patience: None,
            min_improvement: 1e-6,
        }
    }
}

impl SearchConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Builder method to stop after `patience` trials without improvement
    pub fn with_early_stopping(mut self, patience: usize) -> Self {
        self.early_stopping_patience = Some(patience);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.random_state, Some(42));
        assert!(config.early_stopping_patience.is_none());
    }

    #[test]
    fn test_builder() {
        let config = SearchConfig::new().with_random_state(7).with_early_stopping(5);
        assert_eq!(config.random_state, Some(7));
        assert_eq!(config.early_stopping_patience, Some(5));
    }
}
