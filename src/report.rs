//! Plain-text tables for terminals and logs.

use std::fmt::Write;

use crate::dcf::{SensitivityGrid, ValuationResult};

const CELL_WIDTH: usize = 12;

/// Rows are terminal growth rates, columns discount rates. Undefined cells print `n/a`.
pub fn render_sensitivity_table(grid: &SensitivityGrid) -> String {
    let row_labels = grid.row_labels();
    let label_width = row_labels
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(8);

    let mut out = String::new();
    let _ = write!(out, "{:<label_width$}", "");
    for label in grid.column_labels() {
        let _ = write!(out, "{label:>CELL_WIDTH$}");
    }
    out.push('\n');

    for (label, row) in row_labels.iter().zip(&grid.cells) {
        let _ = write!(out, "{label:<label_width$}");
        for cell in row {
            let _ = write!(out, "{cell:>CELL_WIDTH$.2}");
        }
        out.push('\n');
    }
    out
}

pub fn render_projection(result: &ValuationResult) -> String {
    let mut out = String::new();
    for (year, (cf, pv)) in result
        .projected_cash_flows
        .iter()
        .zip(&result.discounted_cash_flows)
        .enumerate()
    {
        let _ = writeln!(out, "Year {}: {:.2} (present value {:.2})", year + 1, cf, pv);
    }
    let _ = writeln!(out, "Terminal value: {:.2}", result.terminal_value);
    let _ = writeln!(out, "Enterprise value: {:.2}", result.enterprise_value);
    let _ = writeln!(out, "Value per share: {:.2}", result.per_share_value);
    out
}
