//! Local statement exports, one CSV per statement kind:
//! `{dir}/incomeStatement-{SYMBOL}-{period}.csv`,
//! `{dir}/balanceSheetStatement-{SYMBOL}-{period}.csv` and
//! `{dir}/cashflowStatement-{SYMBOL}-{period}.csv`, where `period` is
//! `annual` (default) or `quarter`.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::{validate_period, validate_symbol, FinancialDataProvider, ProviderFuture};
use crate::statements::{
    latest_periods, BalanceSheet, CashFlowStatement, IncomeStatement, StatementRow,
};
use crate::{Result, ValuationError};

pub struct CsvStatementProvider {
    directory: PathBuf,
    period: String,
}

impl CsvStatementProvider {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            period: "annual".to_string(),
        }
    }

    /// `annual` or `quarter`, matching the export file suffix.
    pub fn with_period(mut self, period: impl Into<String>) -> Result<Self> {
        self.period = validate_period(&period.into())?;
        Ok(self)
    }

    pub fn statement_path(&self, statement: &str, symbol: &str) -> PathBuf {
        self.directory
            .join(format!("{statement}-{symbol}-{}.csv", self.period))
    }

    async fn load<T>(&self, statement: &str, symbol: &str, limit: usize) -> Result<Vec<T>>
    where
        T: DeserializeOwned + StatementRow,
    {
        validate_symbol(symbol)?;
        let path = self.statement_path(statement, symbol);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ValuationError::MissingInput(format!(
                    "Statement file not found: {}",
                    path.display()
                )))
            }
            Err(e) => return Err(ValuationError::Io(e)),
        };
        let rows: Vec<T> = parse_statements(bytes.as_slice(), &path)?;
        debug!(path = %path.display(), rows = rows.len(), "Loaded statement file");
        if rows.is_empty() {
            return Err(ValuationError::MissingInput(format!(
                "Statement file has no rows: {}",
                path.display()
            )));
        }
        Ok(latest_periods(rows, limit))
    }
}

/// Header and cell whitespace is trimmed; a non-numeric cell in a numeric column
/// is rejected rather than read as zero, and so is `NaN` or `inf`.
pub fn parse_statements<T, R>(reader: R, source: &Path) -> Result<Vec<T>>
where
    T: DeserializeOwned + StatementRow,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.deserialize::<T>() {
        match record {
            Ok(row) => {
                row.ensure_finite().map_err(|e| {
                    ValuationError::MalformedInput(format!("{}: {}", source.display(), e))
                })?;
                rows.push(row);
            }
            Err(e) => {
                let malformed = matches!(e.kind(), csv::ErrorKind::Deserialize { .. });
                return Err(if malformed {
                    ValuationError::MalformedInput(format!("{}: {}", source.display(), e))
                } else {
                    ValuationError::Csv(e)
                });
            }
        }
    }
    Ok(rows)
}

impl FinancialDataProvider for CsvStatementProvider {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn income_statements<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<IncomeStatement>> {
        Box::pin(self.load("incomeStatement", symbol, limit))
    }

    fn balance_sheets<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<BalanceSheet>> {
        Box::pin(self.load("balanceSheetStatement", symbol, limit))
    }

    fn cash_flow_statements<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<CashFlowStatement>> {
        Box::pin(self.load("cashflowStatement", symbol, limit))
    }
}
