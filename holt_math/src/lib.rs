//! # Holt Math
//!
//! Numeric core for per-account budget forecasting.
//!
//! This crate provides double exponential smoothing (Holt's linear trend
//! method) and a holdout-validated grid search over its smoothing
//! coefficients. It performs no I/O and holds no state between calls.
//!
//! ## Example
//!
//! ```
//! use holt_math::{HoltSmoother, HyperparameterSelector};
//!
//! let history = [10.0, 20.0, 30.0, 40.0, 50.0];
//! let pair = HyperparameterSelector::default().select(&history);
//! let fit = HoltSmoother::from_pair(pair).fit(&history);
//! let next = fit.state.forecast_path(3);
//! assert_eq!(next.len(), 3);
//! assert!(next[0] < next[1] && next[1] < next[2]);
//! ```

use thiserror::Error;

pub mod selector;
pub mod smoother;

pub use selector::{HyperparameterSelector, Selection, DEFAULT_GRID};
pub use smoother::{CoefficientPair, HoltFit, HoltSmoother, SmoothingState};

/// Errors raised while configuring the smoothing layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),
}

/// Result type for smoothing operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Round at the given number of decimal places, ties to even.
///
/// A tie is decided on the exact binary value: `250.125` is a tie and
/// becomes `250.12`, while `2.675` sits just below its midpoint and
/// becomes `2.67`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }

    // Exact error of the product, so a midpoint produced by rounding the
    // multiplication is not mistaken for a real tie.
    let residual = value.mul_add(scale, -scaled);
    let rounded = if (scaled - scaled.trunc()).abs() != 0.5 {
        scaled.round()
    } else if residual == 0.0 {
        scaled.round_ties_even()
    } else if residual > 0.0 {
        scaled.ceil()
    } else {
        scaled.floor()
    };
    rounded / scale
}
