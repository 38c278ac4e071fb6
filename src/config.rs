// src/config.rs

//! The planner's small, explicit options surface (spec.md §6), mirroring
//! the teacher's pattern of a plain options struct passed into an engine
//! constructor rather than global config or a file format — there is no
//! configuration *file* to parse here (spec.md's persistence non-goal
//! covers the core, not just plans).

use crate::scorer::ScorerConfig;

/// Tunables for a single `Plan::run` (and the scorer it was planned with).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// Release a producer's record as soon as its last consumer has built,
    /// rather than deferring every release to scope exit.
    pub eager_cleanup: bool,
    /// Scorer exponent on coverage; must be `>= 1`.
    pub length_weight: f64,
    /// Scorer blend weight favoring earlier matching windows.
    pub early_tie_breaker: f64,
    /// Scorer zero-guard.
    pub epsilon: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            eager_cleanup: true,
            length_weight: 1.0,
            early_tie_breaker: 0.1,
            epsilon: 1e-9,
        }
    }
}

impl PlannerConfig {
    pub fn scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            length_weight: self.length_weight,
            early_tie_breaker: self.early_tie_breaker,
            epsilon: self.epsilon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_eagerly_cleans_up_with_a_length_weight_of_one() {
        let cfg = PlannerConfig::default();
        assert!(cfg.eager_cleanup);
        assert_eq!(cfg.length_weight, 1.0);
    }

    #[test]
    fn scorer_config_mirrors_the_planner_config_weights() {
        let cfg = PlannerConfig {
            eager_cleanup: false,
            length_weight: 2.0,
            early_tie_breaker: 0.5,
            epsilon: 1e-6,
        };
        let scorer = cfg.scorer_config();
        assert_eq!(scorer.length_weight, 2.0);
        assert_eq!(scorer.early_tie_breaker, 0.5);
        assert_eq!(scorer.epsilon, 1e-6);
    }
}
