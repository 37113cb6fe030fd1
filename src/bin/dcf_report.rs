//! Prints the base-case valuation and its sensitivity table.
//!
//! Usage: `dcf-report [config.toml]`

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dcf_valuation::config::AppConfig;
use dcf_valuation::dcf::{sensitivity_grid_for_ranges, value};
use dcf_valuation::report::{render_projection, render_sensitivity_table};

fn run() -> dcf_valuation::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    let assumptions = &config.assumptions;
    let inputs = assumptions.valuation_inputs();

    let result = value(&inputs)?;
    info!(
        symbol = %assumptions.symbol,
        base_fcf = result.base_fcf,
        "Base case valued"
    );

    println!(
        "{} ({}): base free cash flow {:.2}",
        assumptions.symbol, assumptions.currency, result.base_fcf
    );
    print!("{}", render_projection(&result));

    let grid = sensitivity_grid_for_ranges(
        &inputs,
        &config.sensitivity.terminal_growth,
        &config.sensitivity.discount_rate,
    )?;
    println!();
    println!("Value per share by terminal growth (rows) and discount rate (columns):");
    print!("{}", render_sensitivity_table(&grid));
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        error!("Report failed: {}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
