//! Historical data sources.
//!
//! A source answers "give me the per-period observations for these
//! tickers" with a [`ReturnTable`]. Missing observations are kept as `None`
//! so that [`ReturnMatrix::from_table`](super::ReturnMatrix::from_table) can
//! reject them explicitly.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Per-period observations, one column per asset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReturnTable {
    /// Period labels in chronological order.
    pub periods: Vec<String>,
    /// Asset identifiers, one per column.
    pub assets: Vec<String>,
    /// Observations; `None` marks a missing value.
    pub columns: Vec<Vec<Option<f64>>>,
}

impl ReturnTable {
    /// Restrict the table to `tickers`, in the order given.
    ///
    /// An empty ticker list selects every column.
    pub fn select(&self, tickers: &[String]) -> Result<ReturnTable> {
        if self.assets.len() != self.columns.len() {
            return Err(FolioError::DataShape(format!(
                "{} asset names for {} columns",
                self.assets.len(),
                self.columns.len()
            )));
        }
        if tickers.is_empty() {
            return Ok(self.clone());
        }

        let mut columns = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let idx = self
                .assets
                .iter()
                .position(|a| a == ticker)
                .ok_or_else(|| FolioError::DataSource(format!("unknown ticker {}", ticker)))?;
            let column = self.columns.get(idx).ok_or_else(|| {
                FolioError::DataShape(format!("no column for ticker {}", ticker))
            })?;
            columns.push(column.clone());
        }

        Ok(ReturnTable {
            periods: self.periods.clone(),
            assets: tickers.to_vec(),
            columns,
        })
    }

    /// Convert adjusted prices to simple returns `p_t / p_{t-1} - 1`.
    ///
    /// The first period is dropped. A return is missing when either price
    /// is missing or the earlier price is zero.
    pub fn prices_to_returns(&self) -> ReturnTable {
        let columns = self
            .columns
            .iter()
            .map(|prices| {
                prices
                    .windows(2)
                    .map(|w| match (w[0], w[1]) {
                        (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        ReturnTable {
            periods: self.periods.iter().skip(1).cloned().collect(),
            assets: self.assets.clone(),
            columns,
        }
    }
}

/// Supplies historical observations for a set of tickers.
pub trait HistoricalDataSource {
    /// Fetch the table for `tickers`, columns in the requested order.
    fn fetch(&self, tickers: &[String]) -> Result<ReturnTable>;
}

/// A source backed by a table already in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    table: ReturnTable,
}

impl InMemorySource {
    pub fn new(table: ReturnTable) -> Self {
        InMemorySource { table }
    }
}

impl HistoricalDataSource for InMemorySource {
    fn fetch(&self, tickers: &[String]) -> Result<ReturnTable> {
        self.table.select(tickers)
    }
}

/// What the numeric cells of a CSV file hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// Adjusted prices, converted to returns on load.
    Prices,
    /// Per-period returns.
    #[default]
    Returns,
}

/// A CSV file with a header row: the first column holds period labels and
/// each further column one ticker. Blank cells are missing values.
///
/// ```text
/// Date,MSFT,XOM
/// 2024-01-02,0.010,-0.020
/// 2024-01-03,0.020,0.010
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    table: ReturnTable,
}

impl CsvSource {
    /// Parse CSV data from a reader.
    pub fn from_reader<R: Read>(reader: R, kind: SeriesKind) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(FolioError::DataSource(
                "expected a period column and at least one ticker column".into(),
            ));
        }
        let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut periods = Vec::new();
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); assets.len()];

        for (line, result) in csv_reader.records().enumerate() {
            let record = result?;
            let label = record
                .get(0)
                .ok_or_else(|| FolioError::DataSource(format!("row {} is empty", line + 1)))?;
            periods.push(label.to_string());

            for (j, column) in columns.iter_mut().enumerate() {
                let cell = record.get(j + 1).unwrap_or("");
                let value = if cell.is_empty() {
                    None
                } else {
                    Some(cell.parse::<f64>().map_err(|e| {
                        FolioError::DataSource(format!(
                            "row {}, column {}: {}",
                            line + 1,
                            assets[j],
                            e
                        ))
                    })?)
                };
                column.push(value);
            }
        }

        let table = ReturnTable {
            periods,
            assets,
            columns,
        };
        let table = match kind {
            SeriesKind::Prices => table.prices_to_returns(),
            SeriesKind::Returns => table,
        };
        Ok(CsvSource { table })
    }

    /// Parse a CSV file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P, kind: SeriesKind) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), kind)
    }

    /// The parsed table.
    pub fn table(&self) -> &ReturnTable {
        &self.table
    }
}

impl HistoricalDataSource for CsvSource {
    fn fetch(&self, tickers: &[String]) -> Result<ReturnTable> {
        self.table.select(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RETURNS_CSV: &str = "Date,MSFT,XOM\n\
        d1,0.01,-0.02\n\
        d2,0.02,0.01\n\
        d3,-0.03,\n";

    #[test]
    fn test_csv_returns() {
        let source = CsvSource::from_reader(RETURNS_CSV.as_bytes(), SeriesKind::Returns).unwrap();
        let table = source.table();
        assert_eq!(table.assets, vec!["MSFT", "XOM"]);
        assert_eq!(table.periods.len(), 3);
        assert_eq!(table.columns[0][2], Some(-0.03));
        assert_eq!(table.columns[1][2], None);
    }

    #[test]
    fn test_csv_prices_become_returns() {
        let csv = "Date,A\nd1,100\nd2,110\nd3,99\n";
        let source = CsvSource::from_reader(csv.as_bytes(), SeriesKind::Prices).unwrap();
        let table = source.table();
        assert_eq!(table.periods, vec!["d2", "d3"]);
        assert_relative_eq!(table.columns[0][0].unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(table.columns[0][1].unwrap(), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_select_rejects_misaligned_table() {
        let table = ReturnTable {
            periods: vec!["d1".into()],
            assets: vec!["A".into(), "B".into()],
            columns: vec![vec![Some(0.01)]],
        };
        let err = table.select(&["B".to_string()]).unwrap_err();
        assert!(matches!(err, FolioError::DataShape(_)));
        let err = table.select(&[]).unwrap_err();
        assert!(matches!(err, FolioError::DataShape(_)));
    }

    #[test]
    fn test_csv_bad_number() {
        let csv = "Date,A\nd1,abc\n";
        let err = CsvSource::from_reader(csv.as_bytes(), SeriesKind::Returns).unwrap_err();
        assert!(matches!(err, FolioError::DataSource(_)));
    }

    #[test]
    fn test_fetch_reorders_and_rejects_unknown() {
        let source = CsvSource::from_reader(RETURNS_CSV.as_bytes(), SeriesKind::Returns).unwrap();
        let table = source.fetch(&["XOM".to_string(), "MSFT".to_string()]).unwrap();
        assert_eq!(table.assets, vec!["XOM", "MSFT"]);
        assert_eq!(table.columns[1][0], Some(0.01));

        let err = source.fetch(&["AAPL".to_string()]).unwrap_err();
        assert!(matches!(err, FolioError::DataSource(_)));
    }

    #[test]
    fn test_in_memory_selects_all_by_default() {
        let table = ReturnTable {
            periods: vec!["d1".into()],
            assets: vec!["A".into(), "B".into()],
            columns: vec![vec![Some(0.01)], vec![Some(0.02)]],
        };
        let source = InMemorySource::new(table.clone());
        assert_eq!(source.fetch(&[]).unwrap(), table);
    }
}
