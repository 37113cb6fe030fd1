use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, CostOfCapitalConfig};
use crate::dcf::valuation::{ensure_finite, ensure_positive};
use crate::dcf::{
    default_scenarios, future_prices, project_revenue, project_scenarios,
    sensitivity_grid_for_ranges, value, wacc, CapitalStructure, FcfForecast, FinancialRatios,
    MarginSeries, RateRange, RatioSettings, RevenueProjection, ScenarioProjection,
    ValuationInputs, ValuationResult,
};
use crate::services::FinancialDataProvider;
use crate::statements::FinancialHistory;
use crate::ValuationError;

/// Upper bound on the competitor list of one benchmark request.
pub const MAX_COMPETITORS: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl SimpleResponse {
    fn ok<T: Serialize>(message: &str, data: &T) -> Result<Json<Self>, ValuationError> {
        Ok(Json(Self {
            success: true,
            message: message.to_string(),
            data: Some(serde_json::to_value(data)?),
        }))
    }
}

impl ValuationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValuationError::InvalidParameter(_) | ValuationError::MalformedInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ValuationError::MissingInput(_) => StatusCode::NOT_FOUND,
            ValuationError::FinancialData(_) | ValuationError::Network(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ValuationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        let body = SimpleResponse {
            success: false,
            message: self.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ValuationError {
    fn from(rejection: JsonRejection) -> Self {
        ValuationError::InvalidParameter(rejection.body_text())
    }
}

impl From<QueryRejection> for ValuationError {
    fn from(rejection: QueryRejection) -> Self {
        ValuationError::InvalidParameter(rejection.body_text())
    }
}

impl From<PathRejection> for ValuationError {
    fn from(rejection: PathRejection) -> Self {
        ValuationError::InvalidParameter(rejection.body_text())
    }
}

// Application state
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn FinancialDataProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(provider: Arc<dyn FinancialDataProvider>, config: AppConfig) -> Self {
        Self {
            provider,
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub inputs: ValuationInputs,
    pub result: ValuationResult,
}

#[derive(Debug, Deserialize)]
pub struct SensitivityRequest {
    pub inputs: ValuationInputs,
    pub terminal_growth: Option<RateRange>,
    pub discount_rate: Option<RateRange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RatiosQuery {
    pub limit: Option<usize>,
    pub tax_rate: Option<f64>,
    pub ebitda_multiple: Option<f64>,
    pub market_cap: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub growth_rate: Option<f64>,
    pub discount_rate: Option<f64>,
    pub years: Option<u32>,
    pub limit: Option<usize>,
    pub latest_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BenchmarkQuery {
    /// Comma-separated symbols.
    pub competitors: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionSource {
    Request,
    /// Derived from the company's statements.
    Estimated,
    Configured,
}

#[derive(Debug, Serialize)]
struct ForecastAssumptions {
    growth_rate: f64,
    growth_source: AssumptionSource,
    discount_rate: f64,
    discount_source: AssumptionSource,
}

#[derive(Debug, Serialize)]
struct ForecastResponse {
    assumptions: ForecastAssumptions,
    forecast: FcfForecast,
    scenarios: Vec<ScenarioProjection>,
    revenue: Option<Vec<RevenueProjection>>,
    price_path: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct BenchmarkResponse {
    symbol: String,
    series: Vec<MarginSeries>,
}

/// Book-value WACC of the latest balance sheet.
fn balance_sheet_wacc(
    history: &FinancialHistory,
    cost: &CostOfCapitalConfig,
) -> Result<f64, ValuationError> {
    let capital = CapitalStructure::from_balance_sheet(
        history.latest_balance()?,
        cost.cost_of_equity(),
        cost.cost_of_debt,
        cost.tax_rate,
    )?;
    wacc(&capital)
}

async fn health_check() -> Json<SimpleResponse> {
    Json(SimpleResponse {
        success: true,
        message: "DCF valuation service is healthy".to_string(),
        data: None,
    })
}

async fn create_valuation(
    payload: Result<Json<ValuationInputs>, JsonRejection>,
) -> Result<Json<SimpleResponse>, ValuationError> {
    let Json(inputs) = payload?;
    let result = value(&inputs)?;
    let report = ValuationReport {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        inputs,
        result,
    };

    info!(
        "Valuation {} computed: per share {:.4}",
        report.id, report.result.per_share_value
    );
    SimpleResponse::ok("Valuation computed successfully", &report)
}

async fn create_sensitivity(
    State(state): State<AppState>,
    payload: Result<Json<SensitivityRequest>, JsonRejection>,
) -> Result<Json<SimpleResponse>, ValuationError> {
    let Json(request) = payload?;
    let defaults = &state.config.sensitivity;
    let terminal_growth = request.terminal_growth.unwrap_or(defaults.terminal_growth);
    let discount_rate = request.discount_rate.unwrap_or(defaults.discount_rate);

    let grid = sensitivity_grid_for_ranges(&request.inputs, &terminal_growth, &discount_rate)?;

    info!(
        "Sensitivity grid computed: {}x{} ({} undefined)",
        grid.rows(),
        grid.columns(),
        grid.undefined_cells()
    );
    SimpleResponse::ok("Sensitivity grid computed successfully", &grid)
}

async fn get_ratios(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<RatiosQuery>, QueryRejection>,
) -> Result<Json<SimpleResponse>, ValuationError> {
    let Path(symbol) = path?;
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(state.config.data_source.statement_limit);
    let settings = RatioSettings {
        tax_rate: query.tax_rate.unwrap_or(state.config.assumptions.tax_rate),
        ebitda_multiple: query
            .ebitda_multiple
            .unwrap_or(state.config.assumptions.ebitda_multiple),
        market_cap: query.market_cap,
    };
    ensure_finite("tax_rate", settings.tax_rate)?;
    if let Some(market_cap) = settings.market_cap {
        ensure_finite("market_cap", market_cap)?;
    }

    let history = state.provider.financial_history(&symbol, limit).await?;
    let ratios = FinancialRatios::from_history(&history, &settings)?;

    info!("Computed ratios for {} from {}", symbol, state.provider.name());
    SimpleResponse::ok("Ratios computed successfully", &ratios)
}

/// Growth defaults to the mean historical FCF growth and the discount rate to
/// the balance-sheet WACC; configured values stand in when either cannot be
/// estimated.
async fn get_fcf_forecast(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Result<Json<SimpleResponse>, ValuationError> {
    let Path(symbol) = path?;
    let Query(query) = query?;
    let assumptions = &state.config.assumptions;
    let years = query.years.unwrap_or(assumptions.horizon);
    let limit = query
        .limit
        .unwrap_or(state.config.data_source.statement_limit);
    if let Some(price) = query.latest_price {
        ensure_positive("latest_price", price)?;
    }

    let history = state.provider.financial_history(&symbol, limit).await?;

    let (growth_rate, growth_source) = match query.growth_rate {
        Some(rate) => (rate, AssumptionSource::Request),
        None => match history.estimated_fcf_growth() {
            Ok(rate) => (rate, AssumptionSource::Estimated),
            Err(e) => {
                warn!("{}: using configured growth rate: {}", symbol, e);
                (assumptions.growth_rate, AssumptionSource::Configured)
            }
        },
    };
    let (discount_rate, discount_source) = match query.discount_rate {
        Some(rate) => (rate, AssumptionSource::Request),
        None => match balance_sheet_wacc(&history, &state.config.cost_of_capital) {
            Ok(rate) => (rate, AssumptionSource::Estimated),
            Err(e) => {
                warn!("{}: using configured discount rate: {}", symbol, e);
                (assumptions.discount_rate, AssumptionSource::Configured)
            }
        },
    };
    ensure_finite("growth_rate", growth_rate)?;

    let forecast = FcfForecast::build(&history, growth_rate, discount_rate, years)?;

    let last_fcf = forecast
        .historical
        .last()
        .map(|point| point.value)
        .ok_or_else(|| ValuationError::missing(format!("{symbol}: no free cash flow")))?;
    let scenarios = project_scenarios(last_fcf, &default_scenarios(), discount_rate, years)?;

    // Companies without usable cost data still get the cash-flow forecast.
    let revenue = match (history.revenue_series(), history.average_gross_margin()) {
        (Ok(series), Ok(gross_margin)) => series
            .last()
            .and_then(|last| project_revenue(last.value, growth_rate, years, gross_margin).ok()),
        _ => None,
    };

    let price_path = query
        .latest_price
        .map(|price| future_prices(price, growth_rate, years))
        .transpose()?;

    info!(
        "FCF forecast for {}: {} years at {:.2}% growth, {:.2}% discount",
        symbol,
        years,
        growth_rate * 100.0,
        discount_rate * 100.0
    );
    SimpleResponse::ok(
        "Forecast computed successfully",
        &ForecastResponse {
            assumptions: ForecastAssumptions {
                growth_rate,
                growth_source,
                discount_rate,
                discount_source,
            },
            forecast,
            scenarios,
            revenue,
            price_path,
        },
    )
}

/// Net-margin series of the company followed by each competitor.
async fn get_benchmark(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<BenchmarkQuery>, QueryRejection>,
) -> Result<Json<SimpleResponse>, ValuationError> {
    let Path(symbol) = path?;
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(state.config.data_source.statement_limit);

    let mut symbols = vec![symbol.clone()];
    let competitors = query.competitors.as_deref().unwrap_or_default();
    for competitor in competitors.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if !symbols.iter().any(|s| s == competitor) {
            symbols.push(competitor.to_string());
        }
    }
    if symbols.len() - 1 > MAX_COMPETITORS {
        return Err(ValuationError::InvalidParameter(format!(
            "at most {MAX_COMPETITORS} competitors per request, got {}",
            symbols.len() - 1
        )));
    }

    let provider = &state.provider;
    let series = try_join_all(symbols.iter().map(|s| async move {
        let statements = provider.income_statements(s, limit).await?;
        MarginSeries::from_income_statements(s.as_str(), &statements)
    }))
    .await?;

    info!(
        "Benchmarked {} against {} competitors",
        symbol,
        series.len() - 1
    );
    SimpleResponse::ok(
        "Benchmark computed successfully",
        &BenchmarkResponse { symbol, series },
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/valuations", post(create_valuation))
        .route("/valuations/sensitivity", post(create_sensitivity))
        .route("/companies/:symbol/ratios", get(get_ratios))
        .route("/companies/:symbol/fcf-forecast", get(get_fcf_forecast))
        .route("/companies/:symbol/benchmark", get(get_benchmark))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
