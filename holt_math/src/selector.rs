//! Holdout grid search over Holt smoothing coefficients

use crate::smoother::{check_unit_interval, CoefficientPair, HoltSmoother, SmoothingState};
use crate::{MathError, Result};
use tracing::debug;

/// Candidate values searched for both `alpha` and `beta`
pub const DEFAULT_GRID: [f64; 6] = [0.1, 0.2, 0.3, 0.5, 0.7, 0.9];

/// Outcome of a coefficient search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// The chosen pair
    pub pair: CoefficientPair,
    /// Holdout mean squared error of the chosen pair, `None` when no
    /// candidate was scored (short series)
    pub mse: Option<f64>,
}

/// Picks `(alpha, beta)` by scoring one-step forecasts on a withheld suffix.
///
/// Candidates are evaluated alpha-major, beta-minor. A candidate replaces the
/// running best only when its error is strictly lower, so ties keep the first
/// pair found.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperparameterSelector {
    alpha_grid: Vec<f64>,
    beta_grid: Vec<f64>,
    holdout_fraction: f64,
    default_pair: CoefficientPair,
    min_points: usize,
}

impl Default for HyperparameterSelector {
    fn default() -> Self {
        Self {
            alpha_grid: DEFAULT_GRID.to_vec(),
            beta_grid: DEFAULT_GRID.to_vec(),
            holdout_fraction: 0.2,
            default_pair: CoefficientPair::default(),
            min_points: 4,
        }
    }
}

impl HyperparameterSelector {
    /// Create a selector over custom grids
    pub fn new(alpha_grid: Vec<f64>, beta_grid: Vec<f64>, holdout_fraction: f64) -> Result<Self> {
        if alpha_grid.is_empty() || beta_grid.is_empty() {
            return Err(MathError::InvalidInput(
                "Coefficient grids must not be empty".to_string(),
            ));
        }
        for &alpha in &alpha_grid {
            check_unit_interval("Alpha", alpha)?;
        }
        for &beta in &beta_grid {
            check_unit_interval("Beta", beta)?;
        }
        check_unit_interval("Holdout fraction", holdout_fraction)?;

        Ok(Self {
            alpha_grid,
            beta_grid,
            holdout_fraction,
            ..Self::default()
        })
    }

    /// Set the pair returned for series too short to validate
    pub fn with_default_pair(mut self, pair: CoefficientPair) -> Self {
        self.default_pair = pair;
        self
    }

    /// Set the shortest series length that is searched rather than defaulted
    pub fn with_min_points(mut self, min_points: usize) -> Result<Self> {
        if min_points < 3 {
            return Err(MathError::InvalidInput(format!(
                "Selection needs at least 3 points to leave a holdout, got {}",
                min_points
            )));
        }
        self.min_points = min_points;
        Ok(self)
    }

    /// Candidate pairs in evaluation order
    pub fn candidates(&self) -> impl Iterator<Item = CoefficientPair> + '_ {
        self.alpha_grid.iter().flat_map(move |&alpha| {
            self.beta_grid
                .iter()
                .map(move |&beta| CoefficientPair { alpha, beta })
        })
    }

    /// Index where the training prefix ends and the holdout begins
    pub fn split_index(&self, len: usize) -> usize {
        let train = (len as f64 * (1.0 - self.holdout_fraction)).floor() as usize;
        train.max(2)
    }

    /// Mean squared one-step error of `pair` on the holdout suffix of `values`.
    ///
    /// The smoother is fitted on the prefix, then walked across the suffix,
    /// scoring each forecast before the actual value is absorbed. Returns NaN
    /// when the holdout is empty.
    pub fn holdout_mse(&self, values: &[f64], pair: CoefficientPair) -> f64 {
        let split = self.split_index(values.len()).min(values.len());
        let (train, holdout) = values.split_at(split);

        let smoother = HoltSmoother::from_pair(pair);
        let mut state: SmoothingState = smoother.fit(train).state;
        let forecasts = smoother.walk(&mut state, holdout);

        let squared: f64 = forecasts
            .iter()
            .zip(holdout)
            .map(|(forecast, actual)| (forecast - actual).powi(2))
            .sum();
        squared / holdout.len() as f64
    }

    /// Select a pair and report its holdout error
    pub fn select_scored(&self, values: &[f64]) -> Selection {
        if values.len() < self.min_points {
            debug!(
                points = values.len(),
                min_points = self.min_points,
                "series too short for holdout search, using default pair"
            );
            return Selection {
                pair: self.default_pair,
                mse: None,
            };
        }

        let mut best_pair = self.default_pair;
        let mut best_mse = f64::INFINITY;
        for pair in self.candidates() {
            let mse = self.holdout_mse(values, pair);
            if mse < best_mse {
                best_mse = mse;
                best_pair = pair;
            }
        }

        debug!(
            points = values.len(),
            split = self.split_index(values.len()),
            alpha = best_pair.alpha,
            beta = best_pair.beta,
            mse = best_mse,
            "selected smoothing coefficients"
        );

        Selection {
            pair: best_pair,
            mse: best_mse.is_finite().then_some(best_mse),
        }
    }

    /// Select the pair with the lowest holdout error
    pub fn select(&self, values: &[f64]) -> CoefficientPair {
        self.select_scored(values).pair
    }

    /// Get the holdout fraction
    pub fn holdout_fraction(&self) -> f64 {
        self.holdout_fraction
    }

    /// Get the fallback pair
    pub fn default_pair(&self) -> CoefficientPair {
        self.default_pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_split_index() {
        let selector = HyperparameterSelector::default();
        assert_eq!(selector.split_index(4), 3);
        assert_eq!(selector.split_index(5), 4);
        assert_eq!(selector.split_index(10), 8);
        assert_eq!(selector.split_index(2), 2);
    }

    #[test]
    fn test_candidate_order() {
        let selector = HyperparameterSelector::default();
        let pairs: Vec<_> = selector.candidates().collect();
        assert_eq!(pairs.len(), 36);
        assert_eq!(pairs[0], CoefficientPair { alpha: 0.1, beta: 0.1 });
        assert_eq!(pairs[1], CoefficientPair { alpha: 0.1, beta: 0.2 });
        assert_eq!(pairs[6], CoefficientPair { alpha: 0.2, beta: 0.1 });
        assert_eq!(pairs[35], CoefficientPair { alpha: 0.9, beta: 0.9 });
    }

    #[test]
    fn test_short_series_uses_default() {
        let selection = HyperparameterSelector::default().select_scored(&[1.0, 2.0, 3.0]);
        assert_eq!(selection.pair, CoefficientPair::default());
        assert_eq!(selection.mse, None);
    }

    #[test]
    fn test_constant_series_keeps_first_pair() {
        // Every candidate scores zero, so the first one evaluated wins.
        let selection = HyperparameterSelector::default().select_scored(&[5.0; 6]);
        assert_eq!(selection.pair, CoefficientPair { alpha: 0.1, beta: 0.1 });
        assert_eq!(selection.mse, Some(0.0));
    }

    #[test]
    fn test_linear_series_selection() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let selection = HyperparameterSelector::default().select_scored(&values);
        assert_eq!(selection.pair, CoefficientPair { alpha: 0.7, beta: 0.9 });
        assert_relative_eq!(selection.mse.unwrap(), 0.0126827914, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_grids() {
        assert!(HyperparameterSelector::new(vec![], vec![0.1], 0.2).is_err());
        assert!(HyperparameterSelector::new(vec![0.1], vec![1.2], 0.2).is_err());
        assert!(HyperparameterSelector::new(vec![0.1], vec![0.2], 0.0).is_err());
        assert!(HyperparameterSelector::default().with_min_points(2).is_err());
    }
}
