//! Mean-Variance (Markowitz) Example
//!
//! maximize    w' mu - gamma * w' Sigma w
//! subject to  sum(w) = 1, w >= 0
//!
//! Sweeps the risk aversion gamma and prints the efficient frontier.

use cvxfolio::prelude::*;
use tracing_subscriber::EnvFilter;

/// Deterministic returns for `n_assets` over `n_periods`.
fn synthetic_returns(n_periods: usize, n_assets: usize) -> Result<ReturnMatrix> {
    let columns = (0..n_assets)
        .map(|j| {
            let drift = 0.0005 * (j + 1) as f64;
            let vol = 0.004 * (j + 1) as f64;
            (0..n_periods)
                .map(|t| drift + vol * ((t * (j + 2)) as f64 * 0.7).sin())
                .collect()
        })
        .collect();
    ReturnMatrix::from_columns(columns)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Mean-Variance Optimization ===\n");

    let returns = synthetic_returns(120, 4)?;
    println!("{} periods, {} assets\n", returns.n_periods(), returns.n_assets());

    println!("{:>8}  {:>10}  {:>10}  weights", "gamma", "return", "volatility");
    for gamma in [0.0, 1.0, 10.0, 100.0, 1000.0] {
        let result = optimize(&returns, &Strategy::MeanVariance { gamma })?;
        match &result.weights {
            Some(weights) => println!(
                "{:>8.1}  {:>10.6}  {:>10.6}  {:?}",
                gamma,
                result.auxiliary["expected_return"],
                result.auxiliary["expected_volatility"],
                weights
            ),
            None => println!("{:>8.1}  {:?}", gamma, result.status),
        }
    }

    Ok(())
}
