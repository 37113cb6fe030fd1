//! Financial ratios, cost of capital and growth estimates.

use crate::statements::{required, BalanceSheet, FinancialHistory, IncomeStatement, YearValue};
use crate::{Result, ValuationError};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::valuation::{ensure_finite, ensure_positive};

fn ratio(numerator: f64, denominator: f64, what: &str) -> Result<f64> {
    ensure_finite(what, numerator)?;
    if !denominator.is_finite() || denominator == 0.0 {
        return Err(ValuationError::invalid(format!(
            "{what}: denominator must be a non-zero finite number, got {denominator}"
        )));
    }
    Ok(numerator / denominator)
}

pub fn current_ratio(current_assets: f64, current_liabilities: f64) -> Result<f64> {
    ratio(current_assets, current_liabilities, "current ratio")
}

pub fn return_on_equity(net_income: f64, equity: f64) -> Result<f64> {
    ratio(net_income, equity, "return on equity")
}

pub fn return_on_assets(net_income: f64, total_assets: f64) -> Result<f64> {
    ratio(net_income, total_assets, "return on assets")
}

pub fn debt_to_equity(total_liabilities: f64, equity: f64) -> Result<f64> {
    ratio(total_liabilities, equity, "debt to equity")
}

/// `amount / revenue`, e.g. net or operating margin.
pub fn margin(amount: f64, revenue: f64) -> Result<f64> {
    ratio(amount, revenue, "margin")
}

pub fn gross_margin(revenue: f64, cost_of_revenue: f64) -> Result<f64> {
    ratio(revenue - cost_of_revenue, revenue, "gross margin")
}

/// `None` when the period carries no interest expense.
pub fn interest_coverage(operating_income: f64, interest_expense: f64) -> Result<Option<f64>> {
    if interest_expense <= 0.0 {
        return Ok(None);
    }
    ratio(operating_income, interest_expense, "interest coverage").map(Some)
}

pub fn nopat(ebit: f64, tax_rate: f64) -> f64 {
    ebit * (1.0 - tax_rate)
}

pub fn return_on_invested_capital(nopat: f64, invested_capital: f64) -> Result<f64> {
    ratio(nopat, invested_capital, "return on invested capital")
}

pub fn intangible_share(goodwill_and_intangibles: f64, total_assets: f64) -> Result<f64> {
    ratio(goodwill_and_intangibles, total_assets, "intangible share")
}

/// `None` when earnings are not positive.
pub fn price_to_earnings(market_cap: f64, net_income: f64) -> Result<Option<f64>> {
    if net_income <= 0.0 {
        return Ok(None);
    }
    ratio(market_cap, net_income, "price to earnings").map(Some)
}

pub fn cagr(initial: f64, final_value: f64, periods: u32) -> Result<f64> {
    if periods == 0 {
        return Err(ValuationError::invalid("CAGR needs at least one period"));
    }
    let growth = ratio(final_value, initial, "CAGR")?;
    if growth <= 0.0 {
        return Err(ValuationError::invalid(format!(
            "CAGR is undefined for a sign change ({initial} -> {final_value})"
        )));
    }
    Ok(growth.powf(1.0 / periods as f64) - 1.0)
}

/// Mean of the period-over-period growth rates of `series` (oldest first).
pub fn average_growth_rate(series: &[f64]) -> Result<f64> {
    if series.len() < 2 {
        return Err(ValuationError::invalid(format!(
            "growth estimate needs at least two observations, got {}",
            series.len()
        )));
    }
    let growth_rates = series
        .windows(2)
        .map(|pair| ratio(pair[1], pair[0], "period growth").map(|g| g - 1.0))
        .collect::<Result<Vec<f64>>>()?;
    Ok(growth_rates.iter().mean())
}

pub fn capm(risk_free_rate: f64, beta: f64, market_return: f64) -> f64 {
    risk_free_rate + beta * (market_return - risk_free_rate)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalStructure {
    pub equity_value: f64,
    pub debt_value: f64,
    pub cost_of_equity: f64,
    pub cost_of_debt: f64,
    pub tax_rate: f64,
}

impl CapitalStructure {
    /// Book weights: stockholders' equity against total liabilities.
    pub fn from_balance_sheet(
        balance: &BalanceSheet,
        cost_of_equity: f64,
        cost_of_debt: f64,
        tax_rate: f64,
    ) -> Result<Self> {
        Ok(Self {
            equity_value: required(balance.total_stockholders_equity, "totalStockholdersEquity")?,
            debt_value: required(balance.total_liabilities, "totalLiabilities")?,
            cost_of_equity,
            cost_of_debt,
            tax_rate,
        })
    }
}

pub fn wacc(capital: &CapitalStructure) -> Result<f64> {
    if capital.equity_value < 0.0 || capital.debt_value < 0.0 {
        return Err(ValuationError::invalid(
            "equity and debt values must not be negative",
        ));
    }
    let total = capital.equity_value + capital.debt_value;
    let equity_weight = ratio(capital.equity_value, total, "equity weight")?;
    let debt_weight = ratio(capital.debt_value, total, "debt weight")?;
    Ok(equity_weight * capital.cost_of_equity
        + debt_weight * capital.cost_of_debt * (1.0 - capital.tax_rate))
}

/// `ebit * (1 - t) + D&A - capex - change in NWC`
pub fn fcf_from_ebit(
    ebit: f64,
    tax_rate: f64,
    depreciation_and_amortization: f64,
    capex: f64,
    change_in_nwc: f64,
) -> f64 {
    nopat(ebit, tax_rate) + depreciation_and_amortization - capex - change_in_nwc
}

pub fn ebitda_multiple_value(ebitda: f64, multiple: f64) -> Result<f64> {
    ensure_finite("ebitda", ebitda)?;
    ensure_positive("multiple", multiple)?;
    Ok(ebitda * multiple)
}

pub const DEFAULT_EBITDA_MULTIPLE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioSettings {
    pub tax_rate: f64,
    pub ebitda_multiple: f64,
    /// P/E is only reported when a market capitalisation is supplied.
    pub market_cap: Option<f64>,
}

impl RatioSettings {
    pub fn new(tax_rate: f64) -> Self {
        Self {
            tax_rate,
            ebitda_multiple: DEFAULT_EBITDA_MULTIPLE,
            market_cap: None,
        }
    }
}

/// Latest-period ratios for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatios {
    pub symbol: String,
    pub net_margin: f64,
    pub return_on_equity: f64,
    pub return_on_assets: f64,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub ebitda_margin: Option<f64>,
    pub current_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub interest_coverage: Option<f64>,
    pub intangible_share: Option<f64>,
    pub return_on_invested_capital: Option<f64>,
    pub revenue_cagr: Option<f64>,
    pub ebitda_multiple_value: Option<f64>,
    pub price_to_earnings: Option<f64>,
    pub free_cash_flow_from_ebit: Option<f64>,
}

impl FinancialRatios {
    pub fn from_history(history: &FinancialHistory, settings: &RatioSettings) -> Result<Self> {
        let tax_rate = settings.tax_rate;
        let income = history.latest_income()?;
        let balance = history.latest_balance()?;

        let revenue = required(income.revenue, "revenue")?;
        let net_income = required(income.net_income, "netIncome")?;
        let total_assets = required(balance.total_assets, "totalAssets")?;
        let equity = required(balance.total_stockholders_equity, "totalStockholdersEquity")?;

        let gross_margin = income
            .cost_of_revenue
            .map(|cost| gross_margin(revenue, cost))
            .transpose()?;
        let operating_margin = income
            .operating_income
            .map(|op| margin(op, revenue))
            .transpose()?;
        let ebitda_margin = income.ebitda.map(|e| margin(e, revenue)).transpose()?;
        let current_ratio = match (balance.total_current_assets, balance.total_current_liabilities) {
            (Some(assets), Some(liabilities)) => Some(current_ratio(assets, liabilities)?),
            _ => None,
        };
        let debt_to_equity = balance
            .total_liabilities
            .map(|l| debt_to_equity(l, equity))
            .transpose()?;
        let interest_coverage = match (income.operating_income, income.interest_expense) {
            (Some(op), Some(interest)) => interest_coverage(op, interest)?,
            _ => None,
        };
        let intangible_share = balance
            .goodwill_and_intangible_assets
            .map(|gi| intangible_share(gi, total_assets))
            .transpose()?;
        let return_on_invested_capital = match (income.operating_income, balance.total_liabilities) {
            (Some(ebit), Some(liabilities)) => Some(return_on_invested_capital(
                nopat(ebit, tax_rate),
                total_assets - liabilities,
            )?),
            _ => None,
        };
        // A single statement or a sign change simply leaves growth unknown.
        let revenue_cagr = history.revenue_cagr().ok();
        let ebitda_multiple_value = income
            .ebitda
            .map(|e| ebitda_multiple_value(e, settings.ebitda_multiple))
            .transpose()?;
        let price_to_earnings = match settings.market_cap {
            Some(market_cap) => price_to_earnings(market_cap, net_income)?,
            None => None,
        };
        let free_cash_flow_from_ebit =
            latest_fcf_from_ebit(history, income.operating_income, tax_rate)?;

        Ok(Self {
            symbol: history.symbol.clone(),
            net_margin: margin(net_income, revenue)?,
            return_on_equity: return_on_equity(net_income, equity)?,
            return_on_assets: return_on_assets(net_income, total_assets)?,
            gross_margin,
            operating_margin,
            ebitda_margin,
            current_ratio,
            debt_to_equity,
            interest_coverage,
            intangible_share,
            return_on_invested_capital,
            revenue_cagr,
            ebitda_multiple_value,
            price_to_earnings,
            free_cash_flow_from_ebit,
        })
    }
}

/// Capex is reported as a negative outflow. Without a prior balance sheet the
/// change in working capital counts as zero.
fn latest_fcf_from_ebit(
    history: &FinancialHistory,
    ebit: Option<f64>,
    tax_rate: f64,
) -> Result<Option<f64>> {
    let cash_flow = match history.latest_cash_flow() {
        Ok(cash_flow) => cash_flow,
        Err(_) => return Ok(None),
    };
    let (ebit, da, capex) = match (
        ebit,
        cash_flow.depreciation_and_amortization,
        cash_flow.capital_expenditure,
    ) {
        (Some(ebit), Some(da), Some(capex)) => (ebit, da, capex),
        _ => return Ok(None),
    };
    let change_in_nwc = history.change_in_working_capital().unwrap_or(0.0);
    let fcf = fcf_from_ebit(ebit, tax_rate, da, capex.abs(), change_in_nwc);
    ensure_finite("free cash flow from EBIT", fcf)?;
    Ok(Some(fcf))
}

/// Net margin per calendar year, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSeries {
    pub symbol: String,
    pub net_margins: Vec<YearValue>,
}

impl MarginSeries {
    pub fn from_income_statements(
        symbol: impl Into<String>,
        statements: &[IncomeStatement],
    ) -> Result<Self> {
        let symbol = symbol.into();
        let mut rows: Vec<&IncomeStatement> = statements.iter().collect();
        rows.sort_by_key(|s| s.date);

        let mut net_margins: Vec<YearValue> = Vec::with_capacity(rows.len());
        for row in rows {
            let (revenue, net_income) = match (row.revenue, row.net_income) {
                (Some(revenue), Some(net_income)) => (revenue, net_income),
                _ => continue,
            };
            let point = YearValue {
                year: row.date.year(),
                value: margin(net_income, revenue)?,
            };
            // Several rows for one year: keep the latest-dated.
            match net_margins.last_mut() {
                Some(last) if last.year == point.year => *last = point,
                _ => net_margins.push(point),
            }
        }
        if net_margins.is_empty() {
            return Err(ValuationError::missing(format!(
                "{symbol}: no periods with both revenue and netIncome"
            )));
        }
        Ok(Self {
            symbol,
            net_margins,
        })
    }
}
