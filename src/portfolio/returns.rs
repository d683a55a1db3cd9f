//! The return matrix consumed by every strategy.

use nalgebra::DMatrix;

use super::source::ReturnTable;
use crate::error::{FolioError, Result};

/// An immutable `T x N` table of per-period asset returns.
///
/// Rows are periods in chronological order and columns are assets; column
/// order defines the index of each asset in a weight vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    data: DMatrix<f64>,
    assets: Vec<String>,
}

impl ReturnMatrix {
    /// Build from one vector of returns per asset, naming assets `asset_0`, ...
    pub fn from_columns(columns: Vec<Vec<f64>>) -> Result<Self> {
        let named = columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| (format!("asset_{}", i), c))
            .collect();
        Self::from_named_columns(named)
    }

    /// Build from `(asset name, returns)` pairs.
    ///
    /// # Errors
    ///
    /// `DataShape` when there are no assets, no periods, columns of
    /// different lengths, or non-finite values.
    pub fn from_named_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let first = columns
            .first()
            .ok_or_else(|| FolioError::DataShape("return table has no assets".into()))?;
        let n_periods = first.1.len();
        if n_periods == 0 {
            return Err(FolioError::DataShape("return table has no periods".into()));
        }

        for (name, col) in &columns {
            if col.len() != n_periods {
                return Err(FolioError::DataShape(format!(
                    "column {} has {} periods, expected {}",
                    name,
                    col.len(),
                    n_periods
                )));
            }
            if let Some(t) = col.iter().position(|v| !v.is_finite()) {
                return Err(FolioError::DataShape(format!(
                    "column {} has a non-finite value at period {}",
                    name, t
                )));
            }
        }

        let n_assets = columns.len();
        let data = DMatrix::from_fn(n_periods, n_assets, |t, j| columns[j].1[t]);
        let assets = columns.into_iter().map(|(name, _)| name).collect();
        Ok(ReturnMatrix { data, assets })
    }

    /// Build from rows, one per period.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows
            .first()
            .ok_or_else(|| FolioError::DataShape("return table has no periods".into()))?;
        let n_assets = first.len();
        if let Some((t, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_assets) {
            return Err(FolioError::DataShape(format!(
                "period {} has {} values, expected {}",
                t,
                row.len(),
                n_assets
            )));
        }
        let columns = (0..n_assets)
            .map(|j| rows.iter().map(|r| r[j]).collect())
            .collect();
        Self::from_columns(columns)
    }

    /// Build from a table returned by a historical data source.
    ///
    /// Any missing observation is rejected; gaps are never filled.
    pub fn from_table(table: &ReturnTable) -> Result<Self> {
        if table.assets.len() != table.columns.len() {
            return Err(FolioError::DataShape(format!(
                "{} asset names for {} columns",
                table.assets.len(),
                table.columns.len()
            )));
        }

        let mut named = Vec::with_capacity(table.columns.len());
        for (name, col) in table.assets.iter().zip(&table.columns) {
            let values = col
                .iter()
                .enumerate()
                .map(|(t, v)| {
                    v.ok_or_else(|| {
                        FolioError::DataShape(format!(
                            "column {} is missing a value at period {}",
                            name, t
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            named.push((name.clone(), values));
        }
        Self::from_named_columns(named)
    }

    /// Number of periods `T`.
    pub fn n_periods(&self) -> usize {
        self.data.nrows()
    }

    /// Number of assets `N`.
    pub fn n_assets(&self) -> usize {
        self.data.ncols()
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Mean return of each asset.
    pub fn column_means(&self) -> Vec<f64> {
        self.data.column_iter().map(|c| c.mean()).collect()
    }

    /// Unbiased sample covariance of the columns (divides by `T - 1`).
    ///
    /// # Errors
    ///
    /// `DataShape` with fewer than two periods.
    pub fn covariance(&self) -> Result<DMatrix<f64>> {
        let t = self.n_periods();
        if t < 2 {
            return Err(FolioError::DataShape(
                "covariance needs at least two periods".into(),
            ));
        }

        let means = self.column_means();
        let centered = DMatrix::from_fn(t, self.n_assets(), |i, j| self.data[(i, j)] - means[j]);
        let mut cov = centered.transpose() * &centered / (t as f64 - 1.0);
        // Exact symmetry for the PSD check
        cov = (&cov + cov.transpose()) * 0.5;
        Ok(cov)
    }

    /// Realized return of a portfolio in each period, `R w`.
    pub fn portfolio_returns(&self, weights: &[f64]) -> Result<Vec<f64>> {
        if weights.len() != self.n_assets() {
            return Err(FolioError::DataShape(format!(
                "{} weights for {} assets",
                weights.len(),
                self.n_assets()
            )));
        }
        let w = nalgebra::DVector::from_column_slice(weights);
        Ok((&self.data * w).iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scenario() -> ReturnMatrix {
        ReturnMatrix::from_rows(&[
            vec![0.01, -0.02],
            vec![0.02, 0.01],
            vec![-0.03, 0.04],
            vec![0.00, 0.02],
        ])
        .unwrap()
    }

    #[test]
    fn test_dimensions_and_names() {
        let r = scenario();
        assert_eq!(r.n_periods(), 4);
        assert_eq!(r.n_assets(), 2);
        assert_eq!(r.assets(), &["asset_0".to_string(), "asset_1".to_string()]);
    }

    #[test]
    fn test_column_means() {
        let mu = scenario().column_means();
        assert_relative_eq!(mu[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(mu[1], 0.0125, epsilon = 1e-12);
    }

    #[test]
    fn test_unbiased_covariance() {
        let cov = scenario().covariance().unwrap();
        assert_relative_eq!(cov[(0, 0)], 14e-4 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 1)], 6.25e-4, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 1)], -4e-4, epsilon = 1e-12);
        assert_eq!(cov[(0, 1)], cov[(1, 0)]);
    }

    #[test]
    fn test_covariance_needs_two_periods() {
        let r = ReturnMatrix::from_rows(&[vec![0.01, 0.02]]).unwrap();
        assert!(matches!(r.covariance(), Err(FolioError::DataShape(_))));
    }

    #[test]
    fn test_portfolio_returns() {
        let rets = scenario().portfolio_returns(&[0.5, 0.5]).unwrap();
        assert_relative_eq!(rets[2], 0.005, epsilon = 1e-12);
        assert!(scenario().portfolio_returns(&[1.0]).is_err());
    }

    #[test]
    fn test_rejects_ragged_and_empty() {
        assert!(matches!(
            ReturnMatrix::from_columns(vec![vec![0.01, 0.02], vec![0.01]]),
            Err(FolioError::DataShape(_))
        ));
        assert!(ReturnMatrix::from_columns(vec![]).is_err());
        assert!(ReturnMatrix::from_columns(vec![vec![]]).is_err());
        assert!(ReturnMatrix::from_rows(&[vec![0.01, 0.02], vec![0.01]]).is_err());
        assert!(ReturnMatrix::from_columns(vec![vec![f64::NAN]]).is_err());
    }

    #[test]
    fn test_from_table_rejects_missing() {
        let table = ReturnTable {
            periods: vec!["d1".into(), "d2".into()],
            assets: vec!["MSFT".into()],
            columns: vec![vec![Some(0.01), None]],
        };
        assert!(matches!(
            ReturnMatrix::from_table(&table),
            Err(FolioError::DataShape(_))
        ));
    }
}
