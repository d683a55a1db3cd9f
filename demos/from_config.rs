//! Configuration-Driven Run
//!
//! Reads returns from CSV and the strategy from JSON, then prints the
//! outcome as JSON.
//!
//! Usage: cargo run --example from_config [config.json] [returns.csv]

use std::env;

use cvxfolio::portfolio::{CsvSource, EngineConfig, SeriesKind};
use cvxfolio::{FolioError, Result};
use tracing_subscriber::EnvFilter;

const SAMPLE_PRICES: &str = "Date,MSFT,XOM
2024-01-02,370.87,100.25
2024-01-03,370.60,101.12
2024-01-04,367.94,100.54
2024-01-05,367.75,101.58
2024-01-08,374.69,100.05
2024-01-09,375.79,99.12
2024-01-10,382.77,98.34
2024-01-11,384.63,99.55
";

const SAMPLE_CONFIG: &str = r#"{
    "tickers": ["MSFT", "XOM"],
    "strategy": {
        "type": "alpha_downside",
        "alphas": [0.5, 1.0],
        "downside": {"percentile": 0.3, "max_loss": -0.01},
        "long_only": true
    },
    "solver": {"max_iter": 200}
}"#;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::from_json(SAMPLE_CONFIG)?,
    };
    let source = match args.next() {
        Some(path) => CsvSource::from_path(path, SeriesKind::Prices)?,
        None => CsvSource::from_reader(SAMPLE_PRICES.as_bytes(), SeriesKind::Prices)?,
    };

    let outcome = config.run(&source)?;
    let json = serde_json::to_string_pretty(&outcome).map_err(FolioError::from)?;
    println!("{}", json);

    Ok(())
}
