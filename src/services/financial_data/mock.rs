use std::collections::HashMap;

use chrono::NaiveDate;

use super::{validate_symbol, FinancialDataProvider, ProviderFuture};
use crate::statements::{
    latest_periods, BalanceSheet, CashFlowStatement, FinancialHistory, IncomeStatement,
};
use crate::{Result, ValuationError};

/// In-memory statements for demos and tests.
pub struct MockFinancialDataProvider {
    pub histories: HashMap<String, FinancialHistory>,
}

impl Default for MockFinancialDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFinancialDataProvider {
    pub fn new() -> Self {
        let mut histories = HashMap::new();
        histories.insert("GRUMAB.MX".to_string(), gruma_history());
        histories.insert("DIS".to_string(), disney_history());
        Self { histories }
    }

    pub fn empty() -> Self {
        Self {
            histories: HashMap::new(),
        }
    }

    pub fn add_history(&mut self, history: FinancialHistory) {
        self.histories.insert(history.symbol.clone(), history);
    }

    fn history(&self, symbol: &str) -> Result<&FinancialHistory> {
        validate_symbol(symbol)?;
        self.histories.get(symbol).ok_or_else(|| {
            ValuationError::MissingInput(format!("No statements found for symbol: {}", symbol))
        })
    }
}

impl FinancialDataProvider for MockFinancialDataProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn income_statements<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<IncomeStatement>> {
        Box::pin(async move {
            let rows = self.history(symbol)?.income_statements.clone();
            Ok(latest_periods(rows, limit))
        })
    }

    fn balance_sheets<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<BalanceSheet>> {
        Box::pin(async move {
            let rows = self.history(symbol)?.balance_sheets.clone();
            Ok(latest_periods(rows, limit))
        })
    }

    fn cash_flow_statements<'a>(
        &'a self,
        symbol: &'a str,
        limit: usize,
    ) -> ProviderFuture<'a, Vec<CashFlowStatement>> {
        Box::pin(async move {
            let rows = self.history(symbol)?.cash_flow_statements.clone();
            Ok(latest_periods(rows, limit))
        })
    }
}

fn period_end(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

// Figures in millions of MXN.
fn gruma_history() -> FinancialHistory {
    let symbol = "GRUMAB.MX";
    let years = [2020, 2021, 2022, 2023, 2024];
    let revenue = [91_103.13, 94_723.1, 108_988.6, 111_493.4, 135_056.19];
    let ebitda = [13_959.65, 13_671.82, 14_625.95, 16_181.83, 26_548.79];
    let net_income = [10_030.45, 14_511.58, 457.75, 19_087.67, 19_042.92];
    let free_cash_flow = [6_215.4, 3_872.9, -1_204.6, 7_930.2, 10_481.7];

    let mut income = Vec::new();
    let mut balance = Vec::new();
    let mut cash_flow = Vec::new();
    for (i, &year) in years.iter().enumerate() {
        let date = period_end(year, 12, 31);
        let cost_of_revenue = revenue[i] * 0.62;
        let operating_income = ebitda[i] * 0.74;
        income.push(IncomeStatement {
            date,
            symbol: Some(symbol.to_string()),
            reported_currency: Some("MXN".to_string()),
            revenue: Some(revenue[i]),
            cost_of_revenue: Some(cost_of_revenue),
            gross_profit: Some(revenue[i] - cost_of_revenue),
            operating_income: Some(operating_income),
            ebitda: Some(ebitda[i]),
            interest_expense: Some(1_450.0 + 120.0 * i as f64),
            net_income: Some(net_income[i]),
            eps: Some(net_income[i] / 441.231),
        });

        let total_assets = 88_000.0 + 6_500.0 * i as f64;
        let total_liabilities = 49_000.0 + 3_100.0 * i as f64;
        balance.push(BalanceSheet {
            date,
            symbol: Some(symbol.to_string()),
            total_assets: Some(total_assets),
            total_liabilities: Some(total_liabilities),
            total_stockholders_equity: Some(total_assets - total_liabilities),
            total_current_assets: Some(41_000.0 + 2_900.0 * i as f64),
            total_current_liabilities: Some(19_500.0 + 1_400.0 * i as f64),
            goodwill_and_intangible_assets: Some(3_350.0),
            total_debt: Some(27_800.0 + 1_250.0 * i as f64),
            net_debt: Some(21_300.0 + 900.0 * i as f64),
        });

        cash_flow.push(CashFlowStatement {
            date,
            symbol: Some(symbol.to_string()),
            operating_cash_flow: Some(free_cash_flow[i] + ebitda[i] * 0.23),
            capital_expenditure: Some(-ebitda[i] * 0.23),
            depreciation_and_amortization: Some(ebitda[i] - operating_income),
            free_cash_flow: Some(free_cash_flow[i]),
        });
    }
    FinancialHistory::new(symbol, income, balance, cash_flow)
}

// Figures in millions of USD, fiscal years ending in September.
fn disney_history() -> FinancialHistory {
    let symbol = "DIS";
    let years = [2020, 2021, 2022, 2023, 2024];
    let revenue = [65_388.0, 67_418.0, 82_722.0, 88_898.0, 91_361.0];
    let cost_of_revenue = [43_880.0, 45_131.0, 54_401.0, 59_201.0, 58_882.0];
    let operating_income = [-1_941.0, 3_659.0, 7_079.0, 6_770.0, 9_040.0];
    let ebitda = [3_167.0, 8_770.0, 12_098.0, 12_146.0, 14_060.0];
    let net_income = [-2_864.0, 2_024.0, 3_145.0, 2_354.0, 4_972.0];
    let free_cash_flow = [3_594.0, 1_988.0, 1_059.0, 4_897.0, 8_559.0];
    let total_assets = [201_549.0, 203_609.0, 203_631.0, 205_579.0, 196_219.0];
    let total_liabilities = [106_548.0, 102_394.0, 97_723.0, 96_292.0, 90_697.0];

    let mut income = Vec::new();
    let mut balance = Vec::new();
    let mut cash_flow = Vec::new();
    for (i, &year) in years.iter().enumerate() {
        let date = period_end(year, 9, 30);
        income.push(IncomeStatement {
            date,
            symbol: Some(symbol.to_string()),
            reported_currency: Some("USD".to_string()),
            revenue: Some(revenue[i]),
            cost_of_revenue: Some(cost_of_revenue[i]),
            gross_profit: Some(revenue[i] - cost_of_revenue[i]),
            operating_income: Some(operating_income[i]),
            ebitda: Some(ebitda[i]),
            interest_expense: Some(1_491.0 - 40.0 * i as f64),
            net_income: Some(net_income[i]),
            eps: Some(net_income[i] / 1_830.0),
        });
        balance.push(BalanceSheet {
            date,
            symbol: Some(symbol.to_string()),
            total_assets: Some(total_assets[i]),
            total_liabilities: Some(total_liabilities[i]),
            total_stockholders_equity: Some(total_assets[i] - total_liabilities[i]),
            total_current_assets: Some(35_251.0 - 2_000.0 * i as f64),
            total_current_liabilities: Some(26_628.0 + 2_000.0 * i as f64),
            goodwill_and_intangible_assets: Some(92_000.0 - 3_500.0 * i as f64),
            total_debt: Some(58_300.0 - 2_500.0 * i as f64),
            net_debt: Some(40_400.0 - 1_800.0 * i as f64),
        });
        cash_flow.push(CashFlowStatement {
            date,
            symbol: Some(symbol.to_string()),
            operating_cash_flow: Some(free_cash_flow[i] + 4_500.0),
            capital_expenditure: Some(-4_500.0),
            depreciation_and_amortization: Some(ebitda[i] - operating_income[i]),
            free_cash_flow: Some(free_cash_flow[i]),
        });
    }
    FinancialHistory::new(symbol, income, balance, cash_flow)
}
