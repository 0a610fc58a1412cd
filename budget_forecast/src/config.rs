//! Forecast configuration and source selection

use crate::error::{ForecastError, Result};
use holt_math::{CoefficientPair, HyperparameterSelector, DEFAULT_GRID};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Delimited file used when no remote dataset is configured
pub const DEFAULT_SERIES_PATH: &str = "users_current_budget_series.csv";

/// Environment variable holding the remote dataset URL
pub const REMOTE_URL_VAR: &str = "SUPABASE_URL";

/// Environment variable holding the remote dataset key
pub const REMOTE_KEY_VAR: &str = "SUPABASE_KEY";

/// Marker of an unfilled template URL
const PLACEHOLDER_URL: &str = "your_supabase_url";

/// Tunables for the forecast pipeline.
///
/// The defaults reproduce the fixed behavior: flat continuation below 3
/// points, a 20% holdout, the six-value grid for both coefficients, and
/// `(0.5, 0.3)` for series shorter than 4 points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Series shorter than this repeat their last value
    pub min_points: usize,
    /// Share of the series withheld for scoring candidates
    pub holdout_fraction: f64,
    pub alpha_grid: Vec<f64>,
    pub beta_grid: Vec<f64>,
    /// Pair used when the series is too short to search
    pub default_pair: CoefficientPair,
    /// Series shorter than this skip the search
    pub min_selection_points: usize,
    /// Decimal places kept in the output
    pub decimals: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_points: 3,
            holdout_fraction: 0.2,
            alpha_grid: DEFAULT_GRID.to_vec(),
            beta_grid: DEFAULT_GRID.to_vec(),
            default_pair: CoefficientPair::default(),
            min_selection_points: 4,
            decimals: 2,
        }
    }
}

impl ForecastConfig {
    /// Read overrides from a JSON document; absent fields keep their defaults
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<()> {
        if self.min_points == 0 {
            return Err(ForecastError::ConfigError(
                "min_points must be at least 1".to_string(),
            ));
        }
        if self.decimals > 12 {
            return Err(ForecastError::ConfigError(format!(
                "decimals must be at most 12, got {}",
                self.decimals
            )));
        }
        CoefficientPair::new(self.default_pair.alpha, self.default_pair.beta)?;
        self.selector().map(|_| ())
    }

    /// Build the coefficient selector these settings describe
    pub fn selector(&self) -> Result<HyperparameterSelector> {
        let selector = HyperparameterSelector::new(
            self.alpha_grid.clone(),
            self.beta_grid.clone(),
            self.holdout_fraction,
        )?
        .with_default_pair(self.default_pair)
        .with_min_points(self.min_selection_points)?;
        Ok(selector)
    }
}

/// Where the series should be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Remote { url: String, key: String },
    Delimited(PathBuf),
}

impl SourceSelection {
    /// Select a source from the process environment
    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Select a source using `lookup` for environment values.
    ///
    /// The remote dataset is chosen only when both its URL and key are set
    /// and the URL is not the template placeholder.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(REMOTE_URL_VAR).filter(|u| !u.is_empty());
        let key = lookup(REMOTE_KEY_VAR).filter(|k| !k.is_empty());
        match (url, key) {
            (Some(url), Some(key)) if !url.contains(PLACEHOLDER_URL) => {
                SourceSelection::Remote { url, key }
            }
            _ => SourceSelection::Delimited(PathBuf::from(DEFAULT_SERIES_PATH)),
        }
    }
}
