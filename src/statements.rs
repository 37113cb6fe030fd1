use crate::{Result, ValuationError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column names follow the financialmodelingprep.com statement exports, so the
/// same records deserialize from its JSON API and from its CSV downloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatement {
    pub date: NaiveDate,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub reported_currency: Option<String>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub cost_of_revenue: Option<f64>,
    #[serde(default)]
    pub gross_profit: Option<f64>,
    #[serde(default)]
    pub operating_income: Option<f64>,
    #[serde(default)]
    pub ebitda: Option<f64>,
    #[serde(default)]
    pub interest_expense: Option<f64>,
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub date: NaiveDate,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub total_assets: Option<f64>,
    #[serde(default)]
    pub total_liabilities: Option<f64>,
    #[serde(default, alias = "totalEquity")]
    pub total_stockholders_equity: Option<f64>,
    #[serde(default)]
    pub total_current_assets: Option<f64>,
    #[serde(default)]
    pub total_current_liabilities: Option<f64>,
    #[serde(default)]
    pub goodwill_and_intangible_assets: Option<f64>,
    #[serde(default)]
    pub total_debt: Option<f64>,
    #[serde(default)]
    pub net_debt: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowStatement {
    pub date: NaiveDate,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub operating_cash_flow: Option<f64>,
    #[serde(default)]
    pub capital_expenditure: Option<f64>,
    #[serde(default)]
    pub depreciation_and_amortization: Option<f64>,
    #[serde(default)]
    pub free_cash_flow: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct YearValue {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialHistory {
    pub symbol: String,
    pub income_statements: Vec<IncomeStatement>,
    pub balance_sheets: Vec<BalanceSheet>,
    pub cash_flow_statements: Vec<CashFlowStatement>,
}

impl FinancialHistory {
    pub fn new(
        symbol: impl Into<String>,
        income_statements: Vec<IncomeStatement>,
        balance_sheets: Vec<BalanceSheet>,
        cash_flow_statements: Vec<CashFlowStatement>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            income_statements,
            balance_sheets,
            cash_flow_statements,
        }
    }

    pub fn latest_income(&self) -> Result<&IncomeStatement> {
        self.income_statements
            .iter()
            .max_by_key(|s| s.date)
            .ok_or_else(|| self.missing("income statements"))
    }

    pub fn latest_balance(&self) -> Result<&BalanceSheet> {
        self.balance_sheets
            .iter()
            .max_by_key(|s| s.date)
            .ok_or_else(|| self.missing("balance sheets"))
    }

    pub fn latest_cash_flow(&self) -> Result<&CashFlowStatement> {
        self.cash_flow_statements
            .iter()
            .max_by_key(|s| s.date)
            .ok_or_else(|| self.missing("cash flow statements"))
    }

    /// Working capital of the latest balance sheet minus that of the one before.
    pub fn change_in_working_capital(&self) -> Option<f64> {
        let mut sheets: Vec<&BalanceSheet> = self.balance_sheets.iter().collect();
        sheets.sort_by_key(|s| std::cmp::Reverse(s.date));
        let working_capital =
            |s: &BalanceSheet| Some(s.total_current_assets? - s.total_current_liabilities?);
        match sheets.as_slice() {
            [latest, previous, ..] => Some(working_capital(latest)? - working_capital(previous)?),
            _ => None,
        }
    }

    /// Free cash flow per calendar year, oldest first. Rows without a value are
    /// skipped; when a year has several rows the latest-dated one wins.
    pub fn free_cash_flow_by_year(&self) -> Result<Vec<YearValue>> {
        let series = by_year(&self.cash_flow_statements, "freeCashFlow", |s| s.free_cash_flow)?;
        if series.is_empty() {
            return Err(self.missing("freeCashFlow values"));
        }
        Ok(series)
    }

    /// Revenue per calendar year, oldest first, deduplicated like free cash flow.
    pub fn revenue_series(&self) -> Result<Vec<YearValue>> {
        let series = by_year(&self.income_statements, "revenue", |s| s.revenue)?;
        if series.is_empty() {
            return Err(self.missing("revenue values"));
        }
        Ok(series)
    }

    /// Compound annual revenue growth over the calendar years between the first
    /// and last statements.
    pub fn revenue_cagr(&self) -> Result<f64> {
        let series = self.revenue_series()?;
        let (first, last) = match (series.first(), series.last()) {
            (Some(first), Some(last)) if last.year > first.year => (first, last),
            _ => {
                return Err(ValuationError::invalid(format!(
                    "{}: revenue CAGR needs statements from at least two years",
                    self.symbol
                )))
            }
        };
        let years = u32::try_from(last.year - first.year)
            .map_err(|_| ValuationError::invalid("revenue CAGR period is out of range"))?;
        crate::dcf::ratios::cagr(first.value, last.value, years)
    }

    /// Mean period-over-period growth of the yearly free cash flow.
    pub fn estimated_fcf_growth(&self) -> Result<f64> {
        let values: Vec<f64> = self
            .free_cash_flow_by_year()?
            .into_iter()
            .map(|point| point.value)
            .collect();
        crate::dcf::ratios::average_growth_rate(&values)
    }

    /// Mean of `(revenue - cost_of_revenue) / revenue` over periods reporting both.
    pub fn average_gross_margin(&self) -> Result<f64> {
        let margins = self
            .income_statements
            .iter()
            .filter_map(|s| match (s.revenue, s.cost_of_revenue) {
                (Some(revenue), Some(cost)) => Some(crate::dcf::ratios::gross_margin(revenue, cost)),
                _ => None,
            })
            .collect::<Result<Vec<f64>>>()?;
        if margins.is_empty() {
            return Err(self.missing("revenue and costOfRevenue pairs"));
        }
        Ok(margins.iter().sum::<f64>() / margins.len() as f64)
    }

    fn missing(&self, what: &str) -> ValuationError {
        ValuationError::missing(format!("{}: no {what}", self.symbol))
    }
}

/// One value per calendar year, oldest first; the latest-dated row of a year wins.
fn by_year<T, F>(rows: &[T], column: &str, extract: F) -> Result<Vec<YearValue>>
where
    T: StatementRow,
    F: Fn(&T) -> Option<f64>,
{
    let mut sorted: Vec<&T> = rows.iter().collect();
    sorted.sort_by_key(|row| row.date());

    let mut values = BTreeMap::new();
    for row in sorted {
        if let Some(value) = extract(row) {
            values.insert(row.date().year(), required(Some(value), column)?);
        }
    }
    Ok(values
        .into_iter()
        .map(|(year, value)| YearValue { year, value })
        .collect())
}

/// Returns the value or a `MissingInput` naming the absent column.
pub fn required(value: Option<f64>, column: &str) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(ValuationError::MalformedInput(format!(
            "{column} is not a finite number: {v}"
        ))),
        None => Err(ValuationError::missing(format!("{column} is missing"))),
    }
}

/// A statement row: a period-end date plus named numeric columns.
pub trait StatementRow {
    fn date(&self) -> NaiveDate;

    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)>;

    /// A present but non-finite cell (`NaN`, `inf`) is malformed, not a number.
    fn ensure_finite(&self) -> Result<()> {
        for (column, value) in self.numeric_columns() {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(ValuationError::MalformedInput(format!(
                        "{column} for {} is not a finite number: {value}",
                        self.date()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl StatementRow for IncomeStatement {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("revenue", self.revenue),
            ("costOfRevenue", self.cost_of_revenue),
            ("grossProfit", self.gross_profit),
            ("operatingIncome", self.operating_income),
            ("ebitda", self.ebitda),
            ("interestExpense", self.interest_expense),
            ("netIncome", self.net_income),
            ("eps", self.eps),
        ]
    }
}

impl StatementRow for BalanceSheet {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("totalAssets", self.total_assets),
            ("totalLiabilities", self.total_liabilities),
            ("totalStockholdersEquity", self.total_stockholders_equity),
            ("totalCurrentAssets", self.total_current_assets),
            ("totalCurrentLiabilities", self.total_current_liabilities),
            ("goodwillAndIntangibleAssets", self.goodwill_and_intangible_assets),
            ("totalDebt", self.total_debt),
            ("netDebt", self.net_debt),
        ]
    }
}

impl StatementRow for CashFlowStatement {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn numeric_columns(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("operatingCashFlow", self.operating_cash_flow),
            ("capitalExpenditure", self.capital_expenditure),
            ("depreciationAndAmortization", self.depreciation_and_amortization),
            ("freeCashFlow", self.free_cash_flow),
        ]
    }
}

/// Keeps the `limit` most recent rows, newest first. A limit of 0 keeps everything.
pub fn latest_periods<T: StatementRow>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(row.date()));
    if limit > 0 {
        rows.truncate(limit);
    }
    rows
}
