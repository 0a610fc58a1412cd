//! Double exponential smoothing (Holt's linear trend method)
//!
//! The smoother is a two-state recursion over `(level, trend)`. State is
//! seeded from the first one or two observations and then advanced once per
//! observation, in order, starting from the first one.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Smoothing coefficients for level (`alpha`) and trend (`beta`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientPair {
    /// Level smoothing factor
    pub alpha: f64,
    /// Trend smoothing factor
    pub beta: f64,
}

impl CoefficientPair {
    /// Create a pair, checking both factors lie strictly between 0 and 1
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        check_unit_interval("Alpha", alpha)?;
        check_unit_interval("Beta", beta)?;
        Ok(Self { alpha, beta })
    }
}

impl Default for CoefficientPair {
    /// The pair used when a series is too short to validate
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.3,
        }
    }
}

pub(crate) fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "{} must be between 0 and 1 (exclusive), got {}",
            name, value
        )));
    }
    Ok(())
}

/// Running level and trend estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SmoothingState {
    pub level: f64,
    pub trend: f64,
}

impl SmoothingState {
    /// Seed the state from the head of a series.
    ///
    /// `level = y[0]`, `trend = y[1] - y[0]` when two observations exist,
    /// otherwise zero. An empty series yields a zero state.
    pub fn initialize(values: &[f64]) -> Self {
        match values {
            [] => Self::default(),
            [first] => Self {
                level: *first,
                trend: 0.0,
            },
            [first, second, ..] => Self {
                level: *first,
                trend: second - first,
            },
        }
    }

    /// Forecast for the next observation
    pub fn one_step_forecast(&self) -> f64 {
        self.level + self.trend
    }

    /// Value `h` steps past the last observation, with the trend held constant
    pub fn extrapolate(&self, h: usize) -> f64 {
        self.level + (h as f64) * self.trend
    }

    /// Extrapolated values for horizons `1..=horizon`
    pub fn forecast_path(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon).map(|h| self.extrapolate(h)).collect()
    }
}

/// Result of fitting the smoother over a series
#[derive(Debug, Clone, PartialEq)]
pub struct HoltFit {
    /// One-step forecasts recorded before each observation was absorbed
    pub fitted: Vec<f64>,
    /// State after the last observation
    pub state: SmoothingState,
}

/// Holt linear trend smoother with fixed coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoltSmoother {
    alpha: f64,
    beta: f64,
}

impl HoltSmoother {
    /// Create a new smoother with the specified coefficients
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        let pair = CoefficientPair::new(alpha, beta)?;
        Ok(Self::from_pair(pair))
    }

    /// Create a smoother from an already validated pair
    pub fn from_pair(pair: CoefficientPair) -> Self {
        Self {
            alpha: pair.alpha,
            beta: pair.beta,
        }
    }

    /// Absorb one observation, returning the forecast that preceded it
    pub fn step(&self, state: &mut SmoothingState, value: f64) -> f64 {
        let forecast = state.one_step_forecast();
        let level = self.alpha * value + (1.0 - self.alpha) * forecast;
        let trend = self.beta * (level - state.level) + (1.0 - self.beta) * state.trend;
        state.level = level;
        state.trend = trend;
        forecast
    }

    /// Absorb a run of observations, returning the pre-update forecasts
    pub fn walk(&self, state: &mut SmoothingState, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&y| self.step(state, y)).collect()
    }

    /// Fit over a full series, seeding from its head
    pub fn fit(&self, values: &[f64]) -> HoltFit {
        let mut state = SmoothingState::initialize(values);
        let fitted = self.walk(&mut state, values);
        HoltFit { fitted, state }
    }

    /// Get the level coefficient
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Get the trend coefficient
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Get both coefficients as a pair
    pub fn pair(&self) -> CoefficientPair {
        CoefficientPair {
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initialize() {
        assert_eq!(SmoothingState::initialize(&[]), SmoothingState::default());
        assert_eq!(
            SmoothingState::initialize(&[4.0]),
            SmoothingState {
                level: 4.0,
                trend: 0.0
            }
        );
        assert_eq!(
            SmoothingState::initialize(&[4.0, 7.0, 1.0]),
            SmoothingState {
                level: 4.0,
                trend: 3.0
            }
        );
    }

    #[test]
    fn test_empty_fit() {
        let fit = HoltSmoother::new(0.5, 0.3).unwrap().fit(&[]);
        assert!(fit.fitted.is_empty());
        assert_eq!(fit.state.level, 0.0);
        assert_eq!(fit.state.trend, 0.0);
    }

    #[test]
    fn test_first_observation_is_absorbed() {
        // The seed is updated with y[0] itself before moving on.
        let smoother = HoltSmoother::new(0.5, 0.5).unwrap();
        let fit = smoother.fit(&[10.0, 14.0]);

        // t=0: forecast 14, level 0.5*10 + 0.5*14 = 12, trend 0.5*2 + 0.5*4 = 3
        // t=1: forecast 15, level 0.5*14 + 0.5*15 = 14.5, trend 0.5*2.5 + 0.5*3 = 2.75
        assert_eq!(fit.fitted, vec![14.0, 15.0]);
        assert_relative_eq!(fit.state.level, 14.5);
        assert_relative_eq!(fit.state.trend, 2.75);
    }

    #[test]
    fn test_linear_series() {
        let smoother = HoltSmoother::new(0.3, 0.2).unwrap();
        let fit = smoother.fit(&[10.0, 20.0, 30.0, 40.0, 50.0]);

        assert_relative_eq!(fit.fitted[0], 20.0);
        assert_relative_eq!(fit.fitted[1], 26.4, epsilon = 1e-9);
        assert_relative_eq!(fit.state.level, 49.72590912, epsilon = 1e-9);
        assert_relative_eq!(fit.state.trend, 8.754527104, epsilon = 1e-9);

        let path = fit.state.forecast_path(3);
        assert!(path.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_extrapolation_holds_trend() {
        let state = SmoothingState {
            level: 100.0,
            trend: -2.5,
        };
        assert_eq!(state.extrapolate(0), 100.0);
        assert_eq!(state.forecast_path(4), vec![97.5, 95.0, 92.5, 90.0]);
        assert!(state.forecast_path(0).is_empty());
    }

    #[test]
    fn test_invalid_coefficients() {
        assert!(HoltSmoother::new(0.0, 0.3).is_err());
        assert!(HoltSmoother::new(0.5, 1.0).is_err());
        assert!(HoltSmoother::new(f64::NAN, 0.3).is_err());
        assert!(CoefficientPair::new(0.9, 0.1).is_ok());
    }

    #[test]
    fn test_accessors_report_coefficients() {
        let smoother = HoltSmoother::new(0.4, 0.6).unwrap();
        assert_eq!(smoother.alpha(), 0.4);
        assert_eq!(smoother.beta(), 0.6);
        assert_eq!(smoother.pair(), CoefficientPair::new(0.4, 0.6).unwrap());

        let from_pair = HoltSmoother::from_pair(CoefficientPair::default());
        assert_eq!(from_pair.pair(), CoefficientPair::default());
    }
}
