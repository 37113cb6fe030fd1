//! Discounted-cash-flow pipeline.
//!
//! Base FCF -> projected series -> terminal value -> discounted sum -> per-share value.
//! Every function here is pure; a non-convergent perpetuity is carried as
//! [`Estimate::Undefined`] instead of NaN, infinity or zero.

use crate::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_HORIZON: u32 = 5;
pub const MAX_HORIZON: u32 = 200;

/// A computed amount, or the explicit marker that no finite amount exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Estimate {
    Defined(f64),
    Undefined,
}

impl Estimate {
    pub fn is_defined(&self) -> bool {
        matches!(self, Estimate::Defined(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Estimate::Undefined)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Estimate::Defined(v) => Some(*v),
            Estimate::Undefined => None,
        }
    }

    pub fn map<F: FnOnce(f64) -> f64>(self, f: F) -> Estimate {
        match self {
            Estimate::Defined(v) => Estimate::Defined(f(v)),
            Estimate::Undefined => Estimate::Undefined,
        }
    }

    pub fn and_then<F: FnOnce(f64) -> Result<Estimate>>(self, f: F) -> Result<Estimate> {
        match self {
            Estimate::Defined(v) => f(v),
            Estimate::Undefined => Ok(Estimate::Undefined),
        }
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimate::Defined(v) => fmt::Display::fmt(v, f),
            // `pad` would truncate to the numeric precision.
            Estimate::Undefined => match f.width() {
                Some(width) => write!(f, "{:>width$}", "n/a"),
                None => f.write_str("n/a"),
            },
        }
    }
}

/// Where the base-period free cash flow comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CashFlowBasis {
    /// `ebitda * (1 - tax_rate) - ebitda * capex_ratio`
    Ebitda {
        ebitda: f64,
        tax_rate: f64,
        capex_ratio: f64,
    },
    /// Capex expressed as a share of revenue instead of EBITDA.
    RevenueCapex {
        ebitda: f64,
        revenue: f64,
        tax_rate: f64,
        capex_ratio: f64,
    },
    /// A reported free-cash-flow figure used as-is.
    Reported { free_cash_flow: f64 },
}

impl CashFlowBasis {
    pub fn base_fcf(&self) -> f64 {
        match *self {
            CashFlowBasis::Ebitda {
                ebitda,
                tax_rate,
                capex_ratio,
            } => compute_base_fcf(ebitda, tax_rate, capex_ratio),
            CashFlowBasis::RevenueCapex {
                ebitda,
                revenue,
                tax_rate,
                capex_ratio,
            } => ebitda * (1.0 - tax_rate) - revenue * capex_ratio,
            CashFlowBasis::Reported { free_cash_flow } => free_cash_flow,
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            CashFlowBasis::Ebitda {
                ebitda,
                tax_rate,
                capex_ratio,
            } => {
                ensure_finite("ebitda", ebitda)?;
                ensure_tax_rate(tax_rate)?;
                ensure_finite("capex_ratio", capex_ratio)
            }
            CashFlowBasis::RevenueCapex {
                ebitda,
                revenue,
                tax_rate,
                capex_ratio,
            } => {
                ensure_finite("ebitda", ebitda)?;
                ensure_finite("revenue", revenue)?;
                ensure_tax_rate(tax_rate)?;
                ensure_finite("capex_ratio", capex_ratio)
            }
            CashFlowBasis::Reported { free_cash_flow } => {
                ensure_finite("free_cash_flow", free_cash_flow)
            }
        }
    }
}

/// First projected year's exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compounding {
    /// `cf[i] = base * (1 + g)^(i + 1)`
    #[default]
    FromYearOne,
    /// `cf[i] = base * (1 + g)^i`; the first projected year equals the base.
    FromYearZero,
}

impl Compounding {
    fn first_exponent(self) -> i32 {
        match self {
            Compounding::FromYearOne => 1,
            Compounding::FromYearZero => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationInputs {
    pub discount_rate: f64,
    pub cash_flow: CashFlowBasis,
    pub growth_rate: f64,
    pub terminal_growth_rate: f64,
    pub shares_outstanding: f64,
    #[serde(default = "default_fx_rate")]
    pub fx_rate: f64,
    #[serde(default = "default_horizon", deserialize_with = "deserialize_horizon")]
    pub horizon: u32,
    #[serde(default)]
    pub compounding: Compounding,
}

fn default_fx_rate() -> f64 {
    1.0
}

/// JSON numbers arrive as `2.5` as readily as `5`; both go through the same check.
fn deserialize_horizon<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    horizon_from_f64(raw).map_err(serde::de::Error::custom)
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON
}

impl ValuationInputs {
    /// Same inputs with the two swept rates replaced.
    pub fn with_rates(mut self, terminal_growth_rate: f64, discount_rate: f64) -> Self {
        self.terminal_growth_rate = terminal_growth_rate;
        self.discount_rate = discount_rate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure_finite("discount_rate", self.discount_rate)?;
        if self.discount_rate <= 0.0 {
            return Err(ValuationError::invalid(format!(
                "discount_rate must be positive, got {}",
                self.discount_rate
            )));
        }
        ensure_finite("growth_rate", self.growth_rate)?;
        ensure_finite("terminal_growth_rate", self.terminal_growth_rate)?;
        ensure_positive("shares_outstanding", self.shares_outstanding)?;
        ensure_positive("fx_rate", self.fx_rate)?;
        checked_horizon(self.horizon)?;
        self.cash_flow.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub base_fcf: f64,
    pub projected_cash_flows: Vec<f64>,
    pub discounted_cash_flows: Vec<f64>,
    pub terminal_value: Estimate,
    pub discounted_terminal_value: Estimate,
    pub enterprise_value: Estimate,
    pub per_share_value: Estimate,
}

pub fn compute_base_fcf(ebitda: f64, tax_rate: f64, capex_ratio: f64) -> f64 {
    ebitda * (1.0 - tax_rate) - ebitda * capex_ratio
}

pub fn project_cash_flows(base_fcf: f64, growth_rate: f64, horizon: u32) -> Result<Vec<f64>> {
    project_cash_flows_with(base_fcf, growth_rate, horizon, Compounding::FromYearOne)
}

pub fn project_cash_flows_with(
    base_fcf: f64,
    growth_rate: f64,
    horizon: u32,
    compounding: Compounding,
) -> Result<Vec<f64>> {
    let horizon = checked_horizon(horizon)?;
    let first = compounding.first_exponent();
    Ok((0..horizon)
        .map(|i| base_fcf * (1.0 + growth_rate).powi(first + i))
        .collect())
}

/// Gordon-growth value of the cash flows after `last_cf`.
pub fn terminal_value(last_cf: f64, terminal_growth: f64, discount_rate: f64) -> Estimate {
    if discount_rate > terminal_growth {
        Estimate::Defined(last_cf * (1.0 + terminal_growth) / (discount_rate - terminal_growth))
    } else {
        Estimate::Undefined
    }
}

pub fn present_value(amount: f64, rate: f64, period: u32) -> Result<f64> {
    ensure_discount_rate(rate)?;
    Ok(amount / (1.0 + rate).powi(exponent(period)?))
}

pub fn discount_series(values: &[f64], rate: f64, start_period: u32) -> Result<Vec<f64>> {
    ensure_discount_rate(rate)?;
    let start = exponent(start_period)?;
    let mut discounted = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        let offset = i32::try_from(i)
            .ok()
            .and_then(|i| start.checked_add(i))
            .ok_or_else(|| ValuationError::invalid("discount period overflow"))?;
        discounted.push(value / (1.0 + rate).powi(offset));
    }
    Ok(discounted)
}

pub fn enterprise_value(discounted_cfs: &[f64], discounted_terminal: Estimate) -> Estimate {
    let explicit: f64 = discounted_cfs.iter().sum();
    discounted_terminal.map(|terminal| explicit + terminal)
}

pub fn per_share_value(
    enterprise_value: Estimate,
    fx_rate: f64,
    shares_outstanding: f64,
) -> Result<Estimate> {
    ensure_positive("shares_outstanding", shares_outstanding)?;
    ensure_positive("fx_rate", fx_rate)?;
    Ok(enterprise_value.map(|ev| ev * fx_rate / shares_outstanding))
}

/// Runs the full pipeline for one set of assumptions.
pub fn value(inputs: &ValuationInputs) -> Result<ValuationResult> {
    inputs.validate()?;

    let base_fcf = inputs.cash_flow.base_fcf();
    let projected_cash_flows = project_cash_flows_with(
        base_fcf,
        inputs.growth_rate,
        inputs.horizon,
        inputs.compounding,
    )?;
    let last_cf = projected_cash_flows.last().copied().unwrap_or(base_fcf);

    let terminal = terminal_value(last_cf, inputs.terminal_growth_rate, inputs.discount_rate);
    let discounted_cash_flows = discount_series(&projected_cash_flows, inputs.discount_rate, 1)?;
    let discounted_terminal = terminal
        .and_then(|tv| present_value(tv, inputs.discount_rate, inputs.horizon).map(Estimate::Defined))?;

    let enterprise = enterprise_value(&discounted_cash_flows, discounted_terminal);
    let per_share = per_share_value(enterprise, inputs.fx_rate, inputs.shares_outstanding)?;

    Ok(ValuationResult {
        base_fcf,
        projected_cash_flows,
        discounted_cash_flows,
        terminal_value: terminal,
        discounted_terminal_value: discounted_terminal,
        enterprise_value: enterprise,
        per_share_value: per_share,
    })
}

/// Validates a horizon that arrived as an untyped number.
pub fn horizon_from_f64(raw: f64) -> Result<u32> {
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > MAX_HORIZON as f64 {
        return Err(ValuationError::invalid(format!(
            "horizon must be a whole number of years between 0 and {MAX_HORIZON}, got {raw}"
        )));
    }
    Ok(raw as u32)
}

fn checked_horizon(horizon: u32) -> Result<i32> {
    if horizon > MAX_HORIZON {
        return Err(ValuationError::invalid(format!(
            "horizon {horizon} exceeds the maximum of {MAX_HORIZON} years"
        )));
    }
    exponent(horizon)
}

fn exponent(period: u32) -> Result<i32> {
    i32::try_from(period)
        .map_err(|_| ValuationError::invalid(format!("period {period} is out of range")))
}

fn ensure_discount_rate(rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= -1.0 {
        return Err(ValuationError::invalid(format!(
            "discount rate must be greater than -1, got {rate}"
        )));
    }
    Ok(())
}

fn ensure_tax_rate(tax_rate: f64) -> Result<()> {
    if !tax_rate.is_finite() || !(0.0..1.0).contains(&tax_rate) {
        return Err(ValuationError::invalid(format!(
            "tax_rate must be in [0, 1), got {tax_rate}"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ValuationError::invalid(format!(
            "{name} must be a finite number, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValuationError::invalid(format!(
            "{name} must be positive, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, prop_assume, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS * expected.abs().max(1.0),
            "expected {expected}, got {actual}"
        );
    }

    fn gruma_inputs() -> ValuationInputs {
        ValuationInputs {
            discount_rate: 0.11,
            cash_flow: CashFlowBasis::Ebitda {
                ebitda: 1006.0,
                tax_rate: 0.30,
                capex_ratio: 0.21,
            },
            growth_rate: 0.10,
            terminal_growth_rate: 0.07,
            shares_outstanding: 435.6,
            fx_rate: 20.4,
            horizon: 5,
            compounding: Compounding::FromYearOne,
        }
    }

    #[test]
    fn base_fcf_subtracts_tax_and_capex_from_ebitda() {
        assert_approx(compute_base_fcf(1006.0, 0.30, 0.21), 492.94);
        assert_approx(compute_base_fcf(100.0, 0.0, 0.0), 100.0);
    }

    #[test]
    fn base_fcf_may_be_negative() {
        assert!(compute_base_fcf(100.0, 0.30, 0.90) < 0.0);
    }

    #[test]
    fn first_projected_year_compounds_once() {
        let flows = project_cash_flows(704.2, 0.10, 5).unwrap();
        assert_eq!(flows.len(), 5);
        assert_approx(flows[0], 774.62);
        assert_approx(flows[4], 704.2 * 1.1_f64.powi(5));
    }

    #[test]
    fn year_zero_compounding_starts_at_base() {
        let flows = project_cash_flows_with(100.0, 0.10, 3, Compounding::FromYearZero).unwrap();
        assert_approx(flows[0], 100.0);
        assert_approx(flows[2], 121.0);
    }

    #[test]
    fn zero_horizon_projects_nothing() {
        assert!(project_cash_flows(100.0, 0.05, 0).unwrap().is_empty());
    }

    #[test]
    fn excessive_horizon_is_rejected() {
        let err = project_cash_flows(100.0, 0.05, MAX_HORIZON + 1).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidParameter(_)));
    }

    #[test]
    fn untyped_horizons_must_be_whole_and_non_negative() {
        assert_eq!(horizon_from_f64(5.0).unwrap(), 5);
        assert_eq!(horizon_from_f64(0.0).unwrap(), 0);
        assert!(horizon_from_f64(2.5).is_err());
        assert!(horizon_from_f64(-1.0).is_err());
        assert!(horizon_from_f64(f64::NAN).is_err());
    }

    #[test]
    fn deserialized_horizon_must_be_whole() {
        let mut raw = serde_json::to_value(gruma_inputs()).unwrap();
        raw["horizon"] = serde_json::json!(2.5);
        let err = serde_json::from_value::<ValuationInputs>(raw.clone()).unwrap_err();
        assert!(err.to_string().contains("horizon"));

        raw["horizon"] = serde_json::json!(7.0);
        assert_eq!(serde_json::from_value::<ValuationInputs>(raw.clone()).unwrap().horizon, 7);

        raw.as_object_mut().unwrap().remove("horizon");
        let inputs: ValuationInputs = serde_json::from_value(raw).unwrap();
        assert_eq!(inputs.horizon, DEFAULT_HORIZON);
    }

    #[test]
    fn terminal_value_uses_gordon_growth() {
        let tv = terminal_value(1000.0, 0.07, 0.11);
        assert_approx(tv.value().unwrap(), 1000.0 * 1.07 / 0.04);
    }

    #[test]
    fn terminal_value_is_undefined_when_growth_reaches_discount_rate() {
        assert_eq!(terminal_value(1000.0, 0.07, 0.05), Estimate::Undefined);
        assert_eq!(terminal_value(1000.0, 0.07, 0.07), Estimate::Undefined);
    }

    #[test]
    fn discount_series_honours_start_period() {
        let discounted = discount_series(&[110.0, 121.0], 0.10, 1).unwrap();
        assert_approx(discounted[0], 100.0);
        assert_approx(discounted[1], 100.0);

        let shifted = discount_series(&[100.0], 0.10, 0).unwrap();
        assert_approx(shifted[0], 100.0);
    }

    #[test]
    fn discount_rate_at_or_below_minus_one_is_rejected() {
        assert!(matches!(
            discount_series(&[1.0], -1.0, 1),
            Err(ValuationError::InvalidParameter(_))
        ));
        assert!(discount_series(&[1.0], -1.5, 1).is_err());
        assert!(discount_series(&[1.0], f64::NAN, 1).is_err());
    }

    #[test]
    fn enterprise_value_propagates_undefined_terminal() {
        assert_eq!(enterprise_value(&[1.0, 2.0], Estimate::Undefined), Estimate::Undefined);
        assert_eq!(enterprise_value(&[1.0, 2.0], Estimate::Defined(3.0)), Estimate::Defined(6.0));
    }

    #[test]
    fn per_share_value_rejects_non_positive_share_counts() {
        for shares in [0.0, -10.0, f64::NAN] {
            let err = per_share_value(Estimate::Defined(1000.0), 1.0, shares).unwrap_err();
            assert!(matches!(err, ValuationError::InvalidParameter(_)));
        }
        assert!(per_share_value(Estimate::Undefined, 1.0, 0.0).is_err());
    }

    #[test]
    fn per_share_value_converts_currency() {
        let v = per_share_value(Estimate::Defined(1000.0), 20.0, 400.0).unwrap();
        assert_eq!(v, Estimate::Defined(50.0));
        assert_eq!(per_share_value(Estimate::Undefined, 20.0, 400.0).unwrap(), Estimate::Undefined);
    }

    #[test]
    fn full_pipeline_matches_hand_computation() {
        let inputs = gruma_inputs();
        let result = value(&inputs).unwrap();

        let base = 1006.0 * 0.7 - 1006.0 * 0.21;
        let flows: Vec<f64> = (1..=5).map(|y| base * 1.1_f64.powi(y)).collect();
        let pv: f64 = flows
            .iter()
            .enumerate()
            .map(|(i, cf)| cf / 1.11_f64.powi(i as i32 + 1))
            .sum();
        let tv = flows[4] * 1.07 / 0.04;
        let ev = pv + tv / 1.11_f64.powi(5);

        assert_approx(result.base_fcf, base);
        assert_approx(result.terminal_value.value().unwrap(), tv);
        assert_approx(result.enterprise_value.value().unwrap(), ev);
        assert_approx(result.per_share_value.value().unwrap(), ev * 20.4 / 435.6);
    }

    #[test]
    fn full_pipeline_marks_non_convergent_valuation_undefined() {
        let inputs = gruma_inputs().with_rates(0.07, 0.05);
        let result = value(&inputs).unwrap();
        assert_eq!(result.terminal_value, Estimate::Undefined);
        assert_eq!(result.discounted_terminal_value, Estimate::Undefined);
        assert_eq!(result.enterprise_value, Estimate::Undefined);
        assert_eq!(result.per_share_value, Estimate::Undefined);
        assert_eq!(result.discounted_cash_flows.len(), 5);
    }

    #[test]
    fn zero_horizon_values_terminal_alone() {
        let mut inputs = gruma_inputs();
        inputs.horizon = 0;
        let result = value(&inputs).unwrap();
        assert!(result.projected_cash_flows.is_empty());
        let expected_tv = result.base_fcf * 1.07 / 0.04;
        assert_approx(result.enterprise_value.value().unwrap(), expected_tv);
        assert_eq!(result.enterprise_value, result.discounted_terminal_value);
    }

    #[test]
    fn reported_basis_skips_ebitda_arithmetic() {
        let mut inputs = gruma_inputs();
        inputs.cash_flow = CashFlowBasis::Reported { free_cash_flow: 704.2 };
        let result = value(&inputs).unwrap();
        assert_approx(result.projected_cash_flows[0], 774.62);
    }

    #[test]
    fn revenue_capex_basis_charges_capex_on_revenue() {
        let basis = CashFlowBasis::RevenueCapex {
            ebitda: 1000.0,
            revenue: 5000.0,
            tax_rate: 0.3,
            capex_ratio: 0.05,
        };
        assert_approx(basis.base_fcf(), 700.0 - 250.0);
    }

    #[test]
    fn invalid_inputs_fail_fast() {
        let mut inputs = gruma_inputs();
        inputs.shares_outstanding = 0.0;
        assert!(matches!(value(&inputs), Err(ValuationError::InvalidParameter(_))));

        let mut inputs = gruma_inputs();
        inputs.cash_flow = CashFlowBasis::Ebitda {
            ebitda: f64::NAN,
            tax_rate: 0.3,
            capex_ratio: 0.2,
        };
        assert!(value(&inputs).is_err());

        let mut inputs = gruma_inputs();
        inputs.cash_flow = CashFlowBasis::Ebitda {
            ebitda: 1000.0,
            tax_rate: 1.0,
            capex_ratio: 0.2,
        };
        assert!(value(&inputs).is_err());
    }

    #[test]
    fn estimate_serializes_with_explicit_status() {
        let defined = serde_json::to_value(Estimate::Defined(1.5)).unwrap();
        assert_eq!(defined, serde_json::json!({"status": "defined", "value": 1.5}));
        let undefined = serde_json::to_value(Estimate::Undefined).unwrap();
        assert_eq!(undefined, serde_json::json!({"status": "undefined"}));
    }

    #[test]
    fn estimate_display_pads_undefined() {
        assert_eq!(format!("{:>6.2}", Estimate::Defined(3.14159)), "  3.14");
        assert_eq!(format!("{:>6.2}", Estimate::Undefined), "   n/a");
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_convergent_terminal_value_keeps_sign_of_last_cash_flow(
            last_cf in -1.0e6f64..1.0e6,
            growth_bp in -9_000i32..2_000,
            spread_bp in 1i32..3_000,
        ) {
            prop_assume!(last_cf.abs() > 1e-6);
            let g = growth_bp as f64 / 10_000.0;
            let r = g + spread_bp as f64 / 10_000.0;
            let tv = terminal_value(last_cf, g, r).value();
            prop_assert!(tv.is_some());
            let tv = tv.unwrap();
            prop_assert!(tv.is_finite());
            prop_assert_eq!(tv.signum(), last_cf.signum());
        }

        #[test]
        fn prop_non_convergent_terminal_value_propagates(
            last_cf in -1.0e6f64..1.0e6,
            rate_bp in 1i32..1_500,
            excess_bp in 0i32..1_500,
        ) {
            let r = rate_bp as f64 / 10_000.0;
            let g = r + excess_bp as f64 / 10_000.0;
            let tv = terminal_value(last_cf, g, r);
            prop_assert_eq!(tv, Estimate::Undefined);
            let ev = enterprise_value(&[1.0, 2.0, 3.0], tv);
            prop_assert_eq!(ev, Estimate::Undefined);
            prop_assert_eq!(per_share_value(ev, 1.0, 100.0).unwrap(), Estimate::Undefined);
        }

        #[test]
        fn prop_pipeline_is_deterministic(
            rate_bp in 100i32..2_000,
            growth_bp in -500i32..2_000,
            terminal_bp in -500i32..1_500,
            horizon in 0u32..15,
        ) {
            let mut inputs = gruma_inputs();
            inputs.discount_rate = rate_bp as f64 / 10_000.0;
            inputs.growth_rate = growth_bp as f64 / 10_000.0;
            inputs.terminal_growth_rate = terminal_bp as f64 / 10_000.0;
            inputs.horizon = horizon;
            let first = value(&inputs).unwrap();
            let second = value(&inputs).unwrap();
            prop_assert_eq!(
                first.per_share_value.value().map(f64::to_bits),
                second.per_share_value.value().map(f64::to_bits)
            );
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_higher_growth_raises_every_projected_year(
            base in 1.0f64..1.0e6,
            low_bp in -5_000i32..5_000,
            step_bp in 1i32..2_000,
            horizon in 1u32..20,
        ) {
            let low = low_bp as f64 / 10_000.0;
            let high = low + step_bp as f64 / 10_000.0;
            let slow = project_cash_flows(base, low, horizon).unwrap();
            let fast = project_cash_flows(base, high, horizon).unwrap();
            for (s, f) in slow.iter().zip(fast.iter()) {
                prop_assert!(f > s);
            }
        }
    }
}
