//! Alpha Maximization with a Downside Floor
//!
//! maximize    w' alpha
//! subject to  mean of the worst k periods of R w >= max_loss
//!
//! k = round(T * percentile). The floor is tightened step by step to show
//! the achievable alpha shrinking, then checked against realized returns.

use cvxfolio::portfolio::tail_report;
use cvxfolio::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Alpha with Downside Constraint ===\n");

    let returns = ReturnMatrix::from_rows(&[
        vec![0.01, -0.02],
        vec![0.02, 0.01],
        vec![-0.03, 0.04],
        vec![0.00, 0.02],
    ])?;
    let percentile = 0.5;

    for long_only in [false, true] {
        println!("long_only = {}", long_only);
        for max_loss in [-0.015, -0.01, -0.005, 0.0, 0.005] {
            let strategy = Strategy::AlphaDownside {
                alphas: vec![1.0, -1.0],
                downside: DownsideSpec::new(percentile, max_loss)?,
                long_only,
            };
            let result = optimize(&returns, &strategy)?;

            match (&result.weights, result.objective_value) {
                (Some(weights), Some(alpha)) => {
                    let report = tail_report(&returns, weights, percentile)?;
                    println!(
                        "  max_loss {:>7.3}: alpha {:>7.4}, weights {:?}, average bad period {:.4}",
                        max_loss, alpha, weights, report.worst_mean
                    );
                }
                _ => println!("  max_loss {:>7.3}: {:?}", max_loss, result.status),
            }
        }
        println!();
    }

    Ok(())
}
