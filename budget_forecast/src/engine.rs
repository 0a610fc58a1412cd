//! Forecast orchestration
//!
//! load -> resolve -> filter and sort -> short-series guard -> select
//! coefficients -> refit over the whole series -> extrapolate -> round.

use crate::config::ForecastConfig;
use crate::data::{SeriesLoader, SeriesSource, SeriesTable, UserSeries};
use crate::error::{ForecastError, Result};
use crate::identity::{Identifier, IdentifierInput, UserKeyResolver};
use holt_math::{round_to, HoltSmoother, HyperparameterSelector, SmoothingState};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// How the forecast values were produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastMethod {
    /// The last observation repeated
    FlatContinuation,
    /// Holt extrapolation with the selected coefficients
    Holt {
        alpha: f64,
        beta: f64,
        /// Holdout error of the pair, absent when the default pair was used
        holdout_mse: Option<f64>,
    },
}

/// Forecast values for a series of values, independent of any table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub method: ForecastMethod,
    /// State after refitting on the full series, for Holt forecasts
    pub state: Option<SmoothingState>,
    pub values: Vec<f64>,
}

/// Forecast for one account with diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    /// Resolved account key
    pub key: String,
    /// Number of observations used
    pub points: usize,
    pub horizon: usize,
    pub method: ForecastMethod,
    pub state: Option<SmoothingState>,
    pub values: Vec<f64>,
}

/// Payload handed back to serving layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub user_id: String,
    pub n: usize,
    pub values: Vec<f64>,
}

impl ForecastResponse {
    /// Build the payload from a report
    pub fn from_report(report: &ForecastReport) -> Self {
        Self {
            user_id: report.key.clone(),
            n: report.horizon,
            values: report.values.clone(),
        }
    }
}

/// Per-account forecasting over a series source.
///
/// The engine holds only configuration; every call reads its source afresh
/// and keeps nothing afterwards.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: ForecastConfig,
    selector: HyperparameterSelector,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self {
            config: ForecastConfig::default(),
            selector: HyperparameterSelector::default(),
        }
    }
}

impl ForecastEngine {
    /// Create an engine after validating `config`
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        let selector = config.selector()?;
        Ok(Self { config, selector })
    }

    /// Get the configuration
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast the next `horizon` values for `identifier`
    pub fn forecast(
        &self,
        identifier: &Identifier,
        horizon: usize,
        source: &SeriesSource,
    ) -> Result<Vec<f64>> {
        Ok(self.forecast_report(identifier, horizon, source)?.values)
    }

    /// Forecast from an unvalidated identifier.
    ///
    /// The source is loaded before the identifier is checked, so schema
    /// errors take precedence over identifier errors.
    pub fn forecast_input(
        &self,
        input: &IdentifierInput,
        horizon: usize,
        source: &SeriesSource,
    ) -> Result<Vec<f64>> {
        let table = SeriesLoader::load(source)?;
        let identifier = Identifier::parse(input)?;
        Ok(self.forecast_table(&identifier, horizon, &table)?.values)
    }

    /// Forecast with diagnostics
    pub fn forecast_report(
        &self,
        identifier: &Identifier,
        horizon: usize,
        source: &SeriesSource,
    ) -> Result<ForecastReport> {
        let table = SeriesLoader::load(source)?;
        self.forecast_table(identifier, horizon, &table)
    }

    /// Forecast from an already loaded table
    pub fn forecast_table(
        &self,
        identifier: &Identifier,
        horizon: usize,
        table: &SeriesTable,
    ) -> Result<ForecastReport> {
        let key = UserKeyResolver::resolve(identifier, &table.keys())?;
        let series: UserSeries = table.series_for(&key);
        let values = series.values();

        let projection = self
            .project(&values, horizon)
            .ok_or_else(|| ForecastError::EmptySeriesError(identifier.to_string()))?;

        info!(
            key = %key,
            points = values.len(),
            horizon,
            method = ?projection.method,
            "forecast complete"
        );

        Ok(ForecastReport {
            key,
            points: values.len(),
            horizon,
            method: projection.method,
            state: projection.state,
            values: projection.values,
        })
    }

    /// Forecast an ordered series of values; `None` when it is empty.
    ///
    /// Coefficients are chosen on a training prefix, then the smoother is
    /// refitted over the entire series before extrapolating.
    pub fn project(&self, values: &[f64], horizon: usize) -> Option<Projection> {
        let last = *values.last()?;
        let decimals = self.config.decimals;

        if values.len() < self.config.min_points {
            warn!(
                points = values.len(),
                min_points = self.config.min_points,
                "too few points to fit a trend, repeating last value"
            );
            return Some(Projection {
                method: ForecastMethod::FlatContinuation,
                state: None,
                values: vec![round_to(last, decimals); horizon],
            });
        }

        let selection = self.selector.select_scored(values);
        let state = HoltSmoother::from_pair(selection.pair).fit(values).state;
        let forecast = state
            .forecast_path(horizon)
            .into_iter()
            .map(|v| round_to(v, decimals))
            .collect();

        Some(Projection {
            method: ForecastMethod::Holt {
                alpha: selection.pair.alpha,
                beta: selection.pair.beta,
                holdout_mse: selection.mse,
            },
            state: Some(state),
            values: forecast,
        })
    }
}

/// Forecast with the default configuration
pub fn forecast(identifier: &Identifier, horizon: usize, source: &SeriesSource) -> Result<Vec<f64>> {
    ForecastEngine::default().forecast(identifier, horizon, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_project_empty() {
        assert!(ForecastEngine::default().project(&[], 3).is_none());
    }

    #[test]
    fn test_project_flat_continuation() {
        let engine = ForecastEngine::default();
        let projection = engine.project(&[10.0, 12.3456], 4).unwrap();
        assert_eq!(projection.method, ForecastMethod::FlatContinuation);
        assert_eq!(projection.values, vec![12.35; 4]);
        assert!(projection.state.is_none());
    }

    #[test]
    fn test_project_three_points_uses_default_pair() {
        let projection = ForecastEngine::default().project(&[1.0, 2.0, 3.0], 2).unwrap();
        match projection.method {
            ForecastMethod::Holt {
                alpha,
                beta,
                holdout_mse,
            } => {
                assert_eq!((alpha, beta), (0.5, 0.3));
                assert_eq!(holdout_mse, None);
            }
            other => panic!("Expected Holt, got {:?}", other),
        }
        assert_eq!(projection.values.len(), 2);
    }

    #[test]
    fn test_project_linear() {
        let projection = ForecastEngine::default()
            .project(&[10.0, 20.0, 30.0, 40.0, 50.0], 3)
            .unwrap();
        assert_eq!(projection.values, vec![60.67, 71.38, 82.09]);
        let state = projection.state.unwrap();
        assert_relative_eq!(state.level, 49.96621463, epsilon = 1e-6);
        assert_relative_eq!(state.trend, 10.708742377, epsilon = 1e-6);
    }

    #[test]
    fn test_project_zero_horizon() {
        let projection = ForecastEngine::default()
            .project(&[1.0, 2.0, 3.0, 4.0], 0)
            .unwrap();
        assert!(projection.values.is_empty());
    }

    #[test]
    fn test_custom_min_points() {
        let config = ForecastConfig {
            min_points: 5,
            ..ForecastConfig::default()
        };
        let engine = ForecastEngine::new(config).unwrap();
        let projection = engine.project(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(projection.method, ForecastMethod::FlatContinuation);
        assert_eq!(projection.values, vec![4.0, 4.0]);
    }
}
