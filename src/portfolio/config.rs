//! Configuration-driven entry point.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::objective::Strategy;
use super::report::{tail_report, TailReport};
use super::returns::ReturnMatrix;
use super::solve::{optimize_with, SolveResult};
use super::source::HistoricalDataSource;
use crate::error::Result;
use crate::solver::Settings;

/// One engine run: which tickers, which strategy, how to solve.
///
/// ```
/// use cvxfolio::portfolio::{EngineConfig, Strategy};
///
/// let config = EngineConfig::from_json(
///     r#"{"tickers": ["MSFT", "XOM"], "strategy": {"type": "mean_variance", "gamma": 0.3}}"#,
/// )
/// .unwrap();
/// assert_eq!(config.strategy, Strategy::MeanVariance { gamma: 0.3 });
/// assert_eq!(config.solver.max_iter, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Assets to fetch, in weight-vector order. Empty means every column.
    pub tickers: Vec<String>,
    pub strategy: Strategy,
    #[serde(default)]
    pub solver: Settings,
    /// Tail fraction for the post-solve report. Downside strategies fall
    /// back to their own percentile.
    #[serde(default)]
    pub report_percentile: Option<f64>,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub assets: Vec<String>,
    pub result: SolveResult,
    pub tail: Option<TailReport>,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    fn tail_percentile(&self) -> Option<f64> {
        match (&self.report_percentile, &self.strategy) {
            (Some(p), _) => Some(*p),
            (None, Strategy::AlphaDownside { downside, .. }) => Some(downside.percentile),
            (None, _) => None,
        }
    }

    /// Fetch data, optimize, and report on the rounded weights.
    pub fn run(&self, source: &dyn HistoricalDataSource) -> Result<RunOutcome> {
        let table = source.fetch(&self.tickers)?;
        let returns = ReturnMatrix::from_table(&table)?;
        info!(
            assets = returns.n_assets(),
            periods = returns.n_periods(),
            "loaded return history"
        );

        let result = optimize_with(&returns, &self.strategy, &self.solver)?;
        let tail = match (&result.weights, self.tail_percentile()) {
            (Some(weights), Some(p)) => Some(tail_report(&returns, weights, p)?),
            _ => None,
        };

        Ok(RunOutcome {
            assets: returns.assets().to_vec(),
            result,
            tail,
        })
    }
}
