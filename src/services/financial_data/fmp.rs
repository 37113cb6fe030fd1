//! financialmodelingprep.com statement endpoints.
//!
//! `GET {base_url}/{endpoint}/{symbol}?limit={limit}&apikey={key}` for the
//! `income-statement`, `balance-sheet-statement` and `cash-flow-statement`
//! endpoints. Transport failures and 5xx responses are retried a bounded number
//! of times; bodies that fail to decode are not.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use super::{validate_period, validate_symbol, FinancialDataProvider, ProviderFuture};
use crate::statements::{
    latest_periods, BalanceSheet, CashFlowStatement, IncomeStatement, StatementRow,
};
use crate::{Result, ValuationError};

pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

pub struct FmpProvider {
    client: Client,
    api_key: String,
    base_url: String,
    max_attempts: u32,
    retry_delay: Duration,
    period: String,
}

#[derive(Deserialize)]
struct FmpErrorBody {
    #[serde(rename = "Error Message")]
    message: String,
}

impl FmpProvider {
    pub fn new<S: Into<String>>(api_key: S, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| FMP_BASE_URL.to_string()),
            max_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            period: "annual".to_string(),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// `annual` or `quarter`.
    pub fn with_period(mut self, period: impl Into<String>) -> Result<Self> {
        self.period = validate_period(&period.into())?;
        Ok(self)
    }

    fn endpoint_url(&self, endpoint: &str, symbol: &str, limit: usize) -> Result<Url> {
        let base = format!("{}/{}/{}", self.base_url.trim_end_matches('/'), endpoint, symbol);
        let mut params = Vec::new();
        if self.period != "annual" {
            params.push(("period", self.period.clone()));
        }
        if limit > 0 {
            params.push(("limit", limit.to_string()));
        }
        params.push(("apikey", self.api_key.clone()));
        Url::parse_with_params(&base, &params)
            .map_err(|e| ValuationError::Configuration(format!("Invalid FMP URL {base}: {e}")))
    }

    async fn fetch_statements<T>(&self, endpoint: &str, symbol: &str, limit: usize) -> Result<Vec<T>>
    where
        T: DeserializeOwned + StatementRow,
    {
        validate_symbol(symbol)?;
        let url = self.endpoint_url(endpoint, symbol, limit)?;
        let rows: Vec<T> = self.fetch_with_retry(url, endpoint, symbol).await?;
        if rows.is_empty() {
            return Err(ValuationError::MissingInput(format!(
                "No {endpoint} data returned for symbol: {symbol}"
            )));
        }
        for row in &rows {
            row.ensure_finite()?;
        }
        debug!(endpoint, symbol, rows = rows.len(), "Fetched statements");
        Ok(latest_periods(rows, limit))
    }

    async fn fetch_with_retry<T>(&self, url: Url, endpoint: &str, symbol: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await?;
                        return decode_body(&body);
                    }
                    if !status.is_server_error() || attempts >= self.max_attempts {
                        return Err(ValuationError::FinancialData(format!(
                            "HTTP {status} from {endpoint} for {symbol}"
                        )));
                    }
                    warn!(endpoint, symbol, %status, attempts, "FMP request failed, retrying");
                }
                Err(e) => {
                    if attempts >= self.max_attempts {
                        return Err(ValuationError::Network(e));
                    }
                    warn!(endpoint, symbol, error = %e, attempts, "FMP request failed, retrying");
                }
            }

            sleep(self.retry_delay).await;
        }
    }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    match serde_json::from_str::<T>(body) {
        Ok(data) => Ok(data),
        Err(e) => match serde_json::from_str::<FmpErrorBody>(body) {
            Ok(error) => Err(ValuationError::FinancialData(error.message)),
            Err(_) => Err(ValuationError::Serialization(e)),
        },
    }
}

impl FinancialDataProvider for FmpProvider {
    fn name(&self) -> &'static str {
        "fmp"
    }

    fn income_statements<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<IncomeStatement>> {
        Box::pin(self.fetch_statements("income-statement", symbol, limit))
    }

    fn balance_sheets<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<BalanceSheet>> {
        Box::pin(self.fetch_statements("balance-sheet-statement", symbol, limit))
    }

    fn cash_flow_statements<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<CashFlowStatement>> {
        Box::pin(self.fetch_statements("cash-flow-statement", symbol, limit))
    }
}
