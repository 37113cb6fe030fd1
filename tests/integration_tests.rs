use dcf_valuation::{
    dcf::{
        project_cash_flows, sensitivity_grid, sensitivity_grid_for_ranges, value, wacc,
        CapitalStructure, CashFlowBasis, Compounding, Estimate, FcfForecast, FinancialRatios,
        RateRange, RatioSettings, ValuationInputs,
    },
    services::{FinancialDataProvider, MockFinancialDataProvider},
    ValuationError,
};

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

#[tokio::test]
async fn test_gruma_base_case_valuation() {
    let inputs = gruma_inputs();
    let result = value(&inputs).unwrap();

    assert!((result.base_fcf - 492.94).abs() < 1e-9);
    assert_eq!(result.projected_cash_flows.len(), 5);
    assert!((result.projected_cash_flows[0] - 542.234).abs() < 1e-9);

    let per_share = result.per_share_value.value().unwrap();
    assert!(per_share.is_finite());
    assert!(per_share > 0.0);

    // Reported 704.2 base grows to 774.62 in the first year
    let flows = project_cash_flows(704.2, 0.10, 5).unwrap();
    assert!((flows[0] - 774.62).abs() < 1e-9);
}

#[tokio::test]
async fn test_sensitivity_grid_marks_non_convergent_cells() {
    let inputs = gruma_inputs();
    let grid = sensitivity_grid_for_ranges(
        &inputs,
        &RateRange::new(0.05, 0.09, 5),
        &RateRange::new(0.09, 0.13, 5),
    )
    .unwrap();

    assert_eq!(grid.rows(), 5);
    assert_eq!(grid.columns(), 5);
    // Only g=9% against WACC=9% fails to converge
    assert_eq!(grid.cell(4, 0), Some(Estimate::Undefined));
    assert_eq!(grid.undefined_cells(), 1);

    // Lower discount rates raise the value along every row
    for row in &grid.cells {
        let defined: Vec<f64> = row.iter().filter_map(Estimate::value).collect();
        for pair in defined.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }
}

#[tokio::test]
async fn test_growth_at_discount_rate_is_undefined_not_an_error() {
    let inputs = gruma_inputs();
    let grid = sensitivity_grid(&inputs, &[0.05], &[0.05, 0.09]).unwrap();

    assert_eq!(grid.cell(0, 0), Some(Estimate::Undefined));
    let finite = grid.cell(0, 1).and_then(|cell| cell.value()).unwrap();
    assert!(finite.is_finite());
    assert!(finite > 0.0);
}

#[tokio::test]
async fn test_invalid_share_count_is_rejected() {
    let mut inputs = gruma_inputs();
    inputs.shares_outstanding = 0.0;
    assert!(matches!(
        value(&inputs),
        Err(ValuationError::InvalidParameter(_))
    ));
}

#[tokio::test]
async fn test_mock_provider_returns_newest_periods_first() {
    let provider = MockFinancialDataProvider::new();
    let history = provider.financial_history("GRUMAB.MX", 3).await.unwrap();

    assert_eq!(history.symbol, "GRUMAB.MX");
    assert_eq!(history.income_statements.len(), 3);
    assert_eq!(history.balance_sheets.len(), 3);
    assert_eq!(history.cash_flow_statements.len(), 3);
    assert!(history.income_statements[0].date > history.income_statements[1].date);

    let fcf = history.free_cash_flow_by_year().unwrap();
    let years: Vec<i32> = fcf.iter().map(|point| point.year).collect();
    assert_eq!(years, vec![2022, 2023, 2024]);
}

#[tokio::test]
async fn test_mock_provider_unknown_symbol() {
    let provider = MockFinancialDataProvider::new();
    let err = provider.financial_history("NOPE", 5).await.unwrap_err();
    assert!(matches!(err, ValuationError::MissingInput(_)));
}

#[tokio::test]
async fn test_disney_fcf_forecast() {
    let provider = MockFinancialDataProvider::new();
    let history = provider.financial_history("DIS", 0).await.unwrap();

    let forecast = FcfForecast::build(&history, 0.05, 0.08, 5).unwrap();
    assert_eq!(forecast.historical.len(), 5);
    assert_eq!(forecast.historical[4].value, 8_559.0);
    assert_eq!(forecast.forecast_years, vec![2025, 2026, 2027, 2028, 2029]);
    assert!((forecast.projected[0] - 8_559.0 * 1.05).abs() < 1e-6);
    assert!(forecast.dcf_value.is_defined());
    assert_eq!(forecast.cumulative.last().copied(), Some(forecast.dcf_value));

    let stalled = FcfForecast::build(&history, 0.08, 0.08, 5).unwrap();
    assert_eq!(stalled.dcf_value, Estimate::Undefined);
    assert!(stalled.cumulative[0].is_defined());
}

#[tokio::test]
async fn test_disney_ratios() {
    let provider = MockFinancialDataProvider::new();
    let history = provider.financial_history("DIS", 5).await.unwrap();
    let settings = RatioSettings {
        market_cap: Some(160_000.0),
        ..RatioSettings::new(0.21)
    };
    let ratios = FinancialRatios::from_history(&history, &settings).unwrap();

    assert_eq!(ratios.symbol, "DIS");
    assert!((ratios.net_margin - 4_972.0 / 91_361.0).abs() < 1e-12);
    assert!((ratios.return_on_assets - 4_972.0 / 196_219.0).abs() < 1e-12);
    let gross = ratios.gross_margin.unwrap();
    assert!((gross - (91_361.0 - 58_882.0) / 91_361.0).abs() < 1e-12);
    let cagr = ratios.revenue_cagr.unwrap();
    assert!((cagr - ((91_361.0_f64 / 65_388.0).powf(0.25) - 1.0)).abs() < 1e-12);
    assert!(ratios.interest_coverage.unwrap() > 0.0);

    assert_eq!(ratios.ebitda_multiple_value, Some(140_600.0));
    assert!((ratios.price_to_earnings.unwrap() - 160_000.0 / 4_972.0).abs() < 1e-9);
    // EBIT 9,040, D&A 5,020, capex 4,500, working capital down 4,000 on the year
    let expected_fcf = 9_040.0 * 0.79 + 5_020.0 - 4_500.0 + 4_000.0;
    assert!((ratios.free_cash_flow_from_ebit.unwrap() - expected_fcf).abs() < 1e-9);
}

#[tokio::test]
async fn test_disney_book_wacc_and_growth_estimate() {
    let provider = MockFinancialDataProvider::new();
    let history = provider.financial_history("DIS", 5).await.unwrap();

    let balance = history.latest_balance().unwrap();
    let capital = CapitalStructure::from_balance_sheet(balance, 0.10, 0.05, 0.25).unwrap();
    let discount_rate = wacc(&capital).unwrap();
    let total = 105_522.0 + 90_697.0;
    let expected = 105_522.0 / total * 0.10 + 90_697.0 / total * 0.05 * 0.75;
    assert!((discount_rate - expected).abs() < 1e-12);

    let fcf = [3_594.0, 1_988.0, 1_059.0, 4_897.0, 8_559.0];
    let expected_growth = fcf.windows(2).map(|p| p[1] / p[0] - 1.0).sum::<f64>() / 4.0;
    let growth = history.estimated_fcf_growth().unwrap();
    assert!((growth - expected_growth).abs() < 1e-12);

    // Growth above the discount rate has no finite perpetuity
    let forecast = FcfForecast::build(&history, growth, discount_rate, 5).unwrap();
    assert_eq!(forecast.dcf_value, Estimate::Undefined);
}
