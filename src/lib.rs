//! # Budget Forecast Workspace
//!
//! Umbrella crate re-exporting the forecasting workspace members.
//!
//! - [`holt_math`]: Holt smoothing and holdout coefficient selection
//! - [`budget_forecast`]: series loading, identifier resolution and the
//!   forecast engine
//!
//! ## Example
//!
//! ```
//! use budget_forecast_workspace::budget_forecast::ForecastEngine;
//!
//! let projection = ForecastEngine::default()
//!     .project(&[100.0, 110.0, 120.0, 130.0, 140.0], 2)
//!     .unwrap();
//! assert_eq!(projection.values.len(), 2);
//! assert!(projection.values[1] > projection.values[0]);
//! ```

pub use budget_forecast;
pub use holt_math;

pub use budget_forecast::{forecast, ForecastEngine, ForecastError, Identifier, SeriesSource};
