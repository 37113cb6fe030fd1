use crate::config::{DataSourceConfig, DataSourceKind};
use crate::statements::{BalanceSheet, CashFlowStatement, FinancialHistory, IncomeStatement};
use crate::{Result, ValuationError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

pub mod csv_files;
pub mod fmp;
pub mod mock;

pub use csv_files::*;
pub use fmp::*;
pub use mock::*;

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Source of historical statements, newest period first.
///
/// `limit` caps the number of periods returned; 0 means every available period.
pub trait FinancialDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn income_statements<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<IncomeStatement>>;

    fn balance_sheets<'a>(&'a self, symbol: &'a str, limit: usize)
        -> ProviderFuture<'a, Vec<BalanceSheet>>;

    fn cash_flow_statements<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<CashFlowStatement>>;

    /// Fetches the three statements concurrently.
    fn financial_history<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, FinancialHistory> {
        Box::pin(async move {
            let (income, balance, cash_flow) = futures::try_join!(
                self.income_statements(symbol, limit),
                self.balance_sheets(symbol, limit),
                self.cash_flow_statements(symbol, limit),
            )?;
            Ok(FinancialHistory::new(symbol, income, balance, cash_flow))
        })
    }
}

/// Tickers are letters, digits, `.` and `-` (`GRUMAB.MX`, `BRK-B`). Anything else
/// would end up in a file name or URL path.
pub fn validate_symbol(symbol: &str) -> Result<()> {
    let valid = !symbol.is_empty()
        && symbol.len() <= 20
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err(ValuationError::InvalidParameter(format!(
            "invalid ticker symbol: {symbol:?}"
        )));
    }
    Ok(())
}

pub fn validate_period(period: &str) -> Result<String> {
    match period {
        "annual" | "quarter" => Ok(period.to_string()),
        other => Err(ValuationError::Configuration(format!(
            "unknown statement period '{other}' (expected annual or quarter)"
        ))),
    }
}

pub fn make_financial_data_provider(
    config: &DataSourceConfig,
) -> Result<Arc<dyn FinancialDataProvider>> {
    let provider: Arc<dyn FinancialDataProvider> = match config.kind {
        DataSourceKind::Mock => Arc::new(MockFinancialDataProvider::new()),
        DataSourceKind::Csv => {
            let directory = config.csv_dir.clone().ok_or_else(|| {
                ValuationError::Configuration("csv data source requires csv_dir".to_string())
            })?;
            Arc::new(CsvStatementProvider::new(directory).with_period(&config.period)?)
        }
        DataSourceKind::Fmp => {
            let api_key = config
                .api_key
                .clone()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| {
                    ValuationError::Configuration("fmp data source requires api_key".to_string())
                })?;
            Arc::new(
                FmpProvider::new(api_key, config.base_url.clone())
                    .with_retry(config.max_attempts, config.retry_delay())
                    .with_period(&config.period)?,
            )
        }
    };
    info!(provider = provider.name(), "Financial data provider ready");
    Ok(provider)
}
