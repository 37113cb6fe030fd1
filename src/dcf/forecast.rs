//! Forward projections that feed charts and scenario tables.

use super::valuation::{discount_series, present_value, project_cash_flows, terminal_value, Estimate};
use crate::statements::{FinancialHistory, YearValue};
use crate::{Result, ValuationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevenueProjection {
    pub year_offset: u32,
    pub revenue: f64,
    pub cost_of_revenue: f64,
    pub gross_profit: f64,
}

/// Grows revenue at a constant rate and splits it with a fixed gross margin.
pub fn project_revenue(
    last_revenue: f64,
    growth_rate: f64,
    years: u32,
    gross_margin: f64,
) -> Result<Vec<RevenueProjection>> {
    if !(0.0..=1.0).contains(&gross_margin) {
        return Err(ValuationError::invalid(format!(
            "gross margin must be in [0, 1], got {gross_margin}"
        )));
    }
    let revenues = project_cash_flows(last_revenue, growth_rate, years)?;
    Ok(revenues
        .into_iter()
        .zip(1..)
        .map(|(revenue, year_offset)| {
            let cost_of_revenue = revenue * (1.0 - gross_margin);
            RevenueProjection {
                year_offset,
                revenue,
                cost_of_revenue,
                gross_profit: revenue - cost_of_revenue,
            }
        })
        .collect())
}

/// `latest_price * (1 + g)^year` for years 1..=years.
pub fn future_prices(latest_price: f64, growth_rate: f64, years: u32) -> Result<Vec<f64>> {
    project_cash_flows(latest_price, growth_rate, years)
}

/// Running total of discounted cash flows; the terminal value lands in the final year.
/// With no explicit years the result is the discounted terminal value alone.
pub fn cumulative_present_value(
    discounted_cfs: &[f64],
    discounted_terminal: Estimate,
) -> Vec<Estimate> {
    if discounted_cfs.is_empty() {
        return vec![discounted_terminal];
    }
    let last = discounted_cfs.len().saturating_sub(1);
    let mut running = 0.0;
    discounted_cfs
        .iter()
        .enumerate()
        .map(|(i, cf)| {
            running += cf;
            if i == last {
                discounted_terminal.map(|tv| running + tv)
            } else {
                Estimate::Defined(running)
            }
        })
        .collect()
}

pub fn forecast_years(last_year: i32, horizon: u32) -> Vec<i32> {
    (1..=horizon as i32).map(|offset| last_year + offset).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthScenario {
    pub name: String,
    pub growth_rate: f64,
}

impl GrowthScenario {
    pub fn new(name: impl Into<String>, growth_rate: f64) -> Self {
        Self {
            name: name.into(),
            growth_rate,
        }
    }
}

pub fn default_scenarios() -> Vec<GrowthScenario> {
    vec![
        GrowthScenario::new("optimistic", 0.10),
        GrowthScenario::new("base", 0.05),
        GrowthScenario::new("pessimistic", 0.02),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub name: String,
    pub growth_rate: f64,
    pub cash_flows: Vec<f64>,
    pub present_value: f64,
}

pub fn project_scenarios(
    last_fcf: f64,
    scenarios: &[GrowthScenario],
    discount_rate: f64,
    horizon: u32,
) -> Result<Vec<ScenarioProjection>> {
    scenarios
        .iter()
        .map(|scenario| {
            let cash_flows = project_cash_flows(last_fcf, scenario.growth_rate, horizon)?;
            let present_value = discount_series(&cash_flows, discount_rate, 1)?.iter().sum();
            Ok(ScenarioProjection {
                name: scenario.name.clone(),
                growth_rate: scenario.growth_rate,
                cash_flows,
                present_value,
            })
        })
        .collect()
}

/// Historical free cash flow joined with its forward projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcfForecast {
    pub symbol: String,
    pub historical: Vec<YearValue>,
    pub forecast_years: Vec<i32>,
    pub projected: Vec<f64>,
    pub discounted: Vec<f64>,
    pub terminal_value: Estimate,
    pub discounted_terminal_value: Estimate,
    pub cumulative: Vec<Estimate>,
    pub dcf_value: Estimate,
}

impl FcfForecast {
    pub fn build(
        history: &FinancialHistory,
        growth_rate: f64,
        discount_rate: f64,
        horizon: u32,
    ) -> Result<Self> {
        let historical = history.free_cash_flow_by_year()?;
        let last = historical
            .last()
            .copied()
            .ok_or_else(|| ValuationError::missing(format!("{}: no free cash flow", history.symbol)))?;

        let projected = project_cash_flows(last.value, growth_rate, horizon)?;
        let discounted = discount_series(&projected, discount_rate, 1)?;
        let last_cf = projected.last().copied().unwrap_or(last.value);
        let terminal = terminal_value(last_cf, growth_rate, discount_rate);
        let discounted_terminal = terminal
            .and_then(|tv| present_value(tv, discount_rate, horizon).map(Estimate::Defined))?;
        let explicit: f64 = discounted.iter().sum();

        Ok(Self {
            symbol: history.symbol.clone(),
            forecast_years: forecast_years(last.year, horizon),
            cumulative: cumulative_present_value(&discounted, discounted_terminal),
            dcf_value: discounted_terminal.map(|tv| explicit + tv),
            historical,
            projected,
            discounted,
            terminal_value: terminal,
            discounted_terminal_value: discounted_terminal,
        })
    }
}
