//! # Budget Forecast
//!
//! Per-account forecasting of a running budget balance.
//!
//! ## Features
//!
//! - Series loading from delimited files, remote table rows or polars frames
//! - Account identifiers validated once into a typed [`Identifier`]
//! - Holt linear trend forecasts with holdout-selected coefficients
//! - Flat continuation for accounts with too little history
//!
//! ## Quick Start
//!
//! ```no_run
//! use budget_forecast::{ForecastEngine, Identifier, SeriesSource};
//!
//! let engine = ForecastEngine::default();
//! let source = SeriesSource::Delimited("users_current_budget_series.csv".into());
//! let account = Identifier::try_from(884_i64)?;
//!
//! // Next seven balances, rounded to cents
//! let values = engine.forecast(&account, 7, &source)?;
//! assert_eq!(values.len(), 7);
//! # Ok::<(), budget_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod identity;

// Re-export commonly used types
pub use crate::config::{ForecastConfig, SourceSelection};
pub use crate::data::{
    Observation, OrderKey, RemoteTable, SeriesLoader, SeriesSource, SeriesTable, UserSeries,
};
pub use crate::engine::{
    forecast, ForecastEngine, ForecastMethod, ForecastReport, ForecastResponse, Projection,
};
pub use crate::error::{ForecastError, Result};
pub use crate::identity::{Identifier, IdentifierInput, ReservedAccount, UserKeyResolver};
pub use holt_math::{CoefficientPair, SmoothingState};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
