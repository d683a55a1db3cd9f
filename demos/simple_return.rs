//! Simple Return Maximization Example
//!
//! maximize    w' mu
//! subject to  sum(w) = 1, w >= 0
//!
//! With no risk term the whole budget goes to the asset with the highest
//! mean return.

use cvxfolio::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Simple Return Maximization ===\n");

    // Columns: MSFT, XOM, JNJ
    let returns = ReturnMatrix::from_named_columns(vec![
        ("MSFT".into(), vec![0.012, -0.004, 0.009, 0.015, -0.011, 0.007]),
        ("XOM".into(), vec![0.003, 0.006, -0.002, 0.004, 0.005, 0.001]),
        ("JNJ".into(), vec![0.001, 0.002, 0.002, -0.001, 0.003, 0.002]),
    ])?;

    let result = optimize(&returns, &Strategy::SimpleReturn)?;

    println!("Status: {:?}", result.status);
    if let (Some(weights), Some(value)) = (&result.weights, result.objective_value) {
        for (asset, w) in returns.assets().iter().zip(weights) {
            println!("  {:<5} {:.3}", asset, w);
        }
        println!("Expected return: {:.5}", value);
    }

    Ok(())
}
