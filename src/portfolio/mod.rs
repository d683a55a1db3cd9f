//! Convex portfolio optimization engine.
//!
//! Data flows through the submodules in order:
//! - `source` and `returns`: historical observations into a [`ReturnMatrix`]
//! - `objective`: a [`Strategy`] turns returns into an objective
//! - `constraints`: budget, no-short and downside constraint groups
//! - `solve`: one convex program, solved and rounded into a [`SolveResult`]
//! - `report`: realized tail statistics of the result
//!
//! ```
//! use cvxfolio::portfolio::{optimize, PortfolioStatus, ReturnMatrix, Strategy};
//!
//! let returns = ReturnMatrix::from_rows(&[
//!     vec![0.01, -0.02],
//!     vec![0.02, 0.01],
//!     vec![-0.03, 0.04],
//!     vec![0.00, 0.02],
//! ])?;
//! let result = optimize(&returns, &Strategy::SimpleReturn)?;
//!
//! assert_eq!(result.status, PortfolioStatus::Optimal);
//! assert_eq!(result.weights, Some(vec![0.0, 1.0]));
//! # Ok::<(), cvxfolio::FolioError>(())
//! ```

pub mod config;
pub mod constraints;
pub mod objective;
pub mod report;
pub mod returns;
pub mod solve;
pub mod source;

pub use config::{EngineConfig, RunOutcome};
pub use constraints::{average_worst_k, ConstraintSet, DownsideSpec};
pub use objective::{Diagnostic, ObjectiveTerms, Strategy};
pub use report::{percentile_linear, tail_report, worst_k_mean, TailReport};
pub use returns::ReturnMatrix;
pub use solve::{optimize, optimize_with, round_weights, solve_program, PortfolioStatus, SolveResult};
pub use source::{CsvSource, HistoricalDataSource, InMemorySource, ReturnTable, SeriesKind};
