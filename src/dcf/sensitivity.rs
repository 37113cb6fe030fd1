//! Two-parameter sweep of the per-share value.
//!
//! Rows are terminal growth rates and columns are discount rates; downstream
//! heat maps and tables rely on that orientation.

use super::valuation::{value, Estimate, ValuationInputs};
use crate::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound on the points in one axis of a sweep.
pub const MAX_STEPS: usize = 101;

/// Inclusive, evenly spaced range of rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateRange {
    pub start: f64,
    pub end: f64,
    pub steps: usize,
}

impl RateRange {
    pub fn new(start: f64, end: f64, steps: usize) -> Self {
        Self { start, end, steps }
    }

    pub fn values(&self) -> Result<Vec<f64>> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ValuationError::invalid(format!(
                "rate range bounds must be finite, got {}..{}",
                self.start, self.end
            )));
        }
        if self.steps > MAX_STEPS {
            return Err(ValuationError::invalid(format!(
                "rate range has {} steps, the maximum is {MAX_STEPS}",
                self.steps
            )));
        }
        match self.steps {
            0 => Err(ValuationError::invalid("rate range needs at least one step")),
            1 => Ok(vec![self.start]),
            steps => {
                let step = (self.end - self.start) / (steps - 1) as f64;
                Ok((0..steps)
                    .map(|i| {
                        if i == steps - 1 {
                            self.end
                        } else {
                            self.start + step * i as f64
                        }
                    })
                    .collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub terminal_growth_rates: Vec<f64>,
    pub discount_rates: Vec<f64>,
    /// `cells[row][col]` is the per-share value for
    /// `(terminal_growth_rates[row], discount_rates[col])`.
    pub cells: Vec<Vec<Estimate>>,
}

impl SensitivityGrid {
    pub fn cell(&self, row: usize, col: usize) -> Option<Estimate> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn columns(&self) -> usize {
        self.discount_rates.len()
    }

    pub fn undefined_cells(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_undefined())
            .count()
    }

    pub fn row_labels(&self) -> Vec<String> {
        self.terminal_growth_rates
            .iter()
            .map(|g| format!("g={:.1}%", g * 100.0))
            .collect()
    }

    pub fn column_labels(&self) -> Vec<String> {
        self.discount_rates
            .iter()
            .map(|w| format!("WACC={:.1}%", w * 100.0))
            .collect()
    }
}

/// Recomputes the whole pipeline for every (terminal growth, discount rate) pair.
pub fn sensitivity_grid(
    fixed_inputs: &ValuationInputs,
    growth_rate_range: &[f64],
    discount_rate_range: &[f64],
) -> Result<SensitivityGrid> {
    let mut cells = Vec::with_capacity(growth_rate_range.len());
    for &terminal_growth in growth_rate_range {
        let mut row = Vec::with_capacity(discount_rate_range.len());
        for &discount_rate in discount_rate_range {
            let inputs = fixed_inputs.with_rates(terminal_growth, discount_rate);
            row.push(value(&inputs)?.per_share_value);
        }
        cells.push(row);
    }

    let grid = SensitivityGrid {
        terminal_growth_rates: growth_rate_range.to_vec(),
        discount_rates: discount_rate_range.to_vec(),
        cells,
    };
    debug!(
        rows = grid.rows(),
        columns = grid.columns(),
        undefined = grid.undefined_cells(),
        "Computed sensitivity grid"
    );
    Ok(grid)
}

pub fn sensitivity_grid_for_ranges(
    fixed_inputs: &ValuationInputs,
    terminal_growth: &RateRange,
    discount_rate: &RateRange,
) -> Result<SensitivityGrid> {
    sensitivity_grid(fixed_inputs, &terminal_growth.values()?, &discount_rate.values()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcf::valuation::{CashFlowBasis, Compounding};

    fn inputs() -> ValuationInputs {
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
    fn rate_range_includes_both_ends() {
        let values = RateRange::new(0.05, 0.09, 5).values().unwrap();
        assert_eq!(values.len(), 5);
        assert_eq!(values[0], 0.05);
        assert!((values[2] - 0.07).abs() < 1e-12);
        assert_eq!(values[4], 0.09);
        assert_eq!(RateRange::new(0.05, 0.09, 1).values().unwrap(), vec![0.05]);
        assert!(RateRange::new(0.05, 0.09, 0).values().is_err());
    }

    #[test]
    fn oversized_rate_range_is_rejected() {
        assert_eq!(RateRange::new(0.05, 0.09, MAX_STEPS).values().unwrap().len(), MAX_STEPS);
        for steps in [MAX_STEPS + 1, 1 << 40, usize::MAX] {
            let err = RateRange::new(0.05, 0.09, steps).values().unwrap_err();
            assert!(matches!(err, ValuationError::InvalidParameter(_)));
        }
    }

    #[test]
    fn grid_rows_are_terminal_growth_and_columns_discount_rates() {
        let grid = sensitivity_grid(&inputs(), &[0.05, 0.07, 0.09], &[0.09, 0.11]).unwrap();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.columns(), 2);
        assert_eq!(grid.row_labels(), vec!["g=5.0%", "g=7.0%", "g=9.0%"]);
        assert_eq!(grid.column_labels(), vec!["WACC=9.0%", "WACC=11.0%"]);

        let expected = value(&inputs().with_rates(0.07, 0.11)).unwrap().per_share_value;
        assert_eq!(grid.cell(1, 1), Some(expected));
        // g=9% against WACC=9%
        assert_eq!(grid.cell(2, 0), Some(Estimate::Undefined));
        assert_eq!(grid.undefined_cells(), 1);
        assert_eq!(grid.cell(3, 0), None);
    }

    #[test]
    fn one_invalid_discount_rate_fails_the_sweep() {
        let err = sensitivity_grid(&inputs(), &[0.05], &[0.09, -1.0]).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidParameter(_)));
    }

    #[test]
    fn empty_axes_give_an_empty_grid() {
        let grid = sensitivity_grid(&inputs(), &[], &[0.09]).unwrap();
        assert_eq!(grid.rows(), 0);
        assert_eq!(grid.undefined_cells(), 0);
    }
}
