//! Application configuration.
//!
//! Loaded from a TOML file (every section optional) and then overridden from
//! `DCF_*` environment variables. Nothing here is hard-coded at call sites: file
//! locations, API keys and base-case assumptions all flow in through
//! [`AppConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dcf::{
    capm, CashFlowBasis, Compounding, RateRange, ValuationInputs, DEFAULT_EBITDA_MULTIPLE,
};
use crate::{Result, ValuationError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data_source: DataSourceConfig,
    pub assumptions: AssumptionsConfig,
    pub cost_of_capital: CostOfCapitalConfig,
    pub sensitivity: SensitivityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    #[default]
    Mock,
    Csv,
    Fmp,
}

impl std::str::FromStr for DataSourceKind {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(DataSourceKind::Mock),
            "csv" => Ok(DataSourceKind::Csv),
            "fmp" => Ok(DataSourceKind::Fmp),
            other => Err(ValuationError::Configuration(format!(
                "unknown data source '{other}' (expected mock, csv or fmp)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    pub kind: DataSourceKind,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub csv_dir: Option<PathBuf>,
    /// `annual` or `quarter`.
    pub period: String,
    /// Number of periods requested per statement.
    pub statement_limit: usize,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            kind: DataSourceKind::Mock,
            api_key: None,
            base_url: None,
            csv_dir: None,
            period: "annual".to_string(),
            statement_limit: 5,
            max_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl DataSourceConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Base-case valuation assumptions. Defaults describe GRUMA's 2023 annual report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssumptionsConfig {
    pub symbol: String,
    pub currency: String,
    pub discount_rate: f64,
    pub growth_rate: f64,
    pub terminal_growth_rate: f64,
    pub ebitda: f64,
    pub tax_rate: f64,
    pub capex_ratio: f64,
    pub shares_outstanding: f64,
    pub fx_rate: f64,
    pub horizon: u32,
    pub compounding: Compounding,
    pub ebitda_multiple: f64,
}

impl Default for AssumptionsConfig {
    fn default() -> Self {
        Self {
            symbol: "GRUMAB.MX".to_string(),
            currency: "MXN".to_string(),
            discount_rate: 0.11,
            growth_rate: 0.10,
            terminal_growth_rate: 0.07,
            ebitda: 1006.0,
            tax_rate: 0.30,
            capex_ratio: 0.21,
            shares_outstanding: 435.6,
            fx_rate: 20.4,
            horizon: 5,
            compounding: Compounding::FromYearOne,
            ebitda_multiple: DEFAULT_EBITDA_MULTIPLE,
        }
    }
}

impl AssumptionsConfig {
    pub fn valuation_inputs(&self) -> ValuationInputs {
        ValuationInputs {
            discount_rate: self.discount_rate,
            cash_flow: CashFlowBasis::Ebitda {
                ebitda: self.ebitda,
                tax_rate: self.tax_rate,
                capex_ratio: self.capex_ratio,
            },
            growth_rate: self.growth_rate,
            terminal_growth_rate: self.terminal_growth_rate,
            shares_outstanding: self.shares_outstanding,
            fx_rate: self.fx_rate,
            horizon: self.horizon,
            compounding: self.compounding,
        }
    }
}

/// Inputs of the book-value WACC used when a forecast names no discount rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostOfCapitalConfig {
    pub cost_of_equity: f64,
    pub cost_of_debt: f64,
    pub tax_rate: f64,
    /// Replaces `cost_of_equity` when present.
    pub capm: Option<CapmConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapmConfig {
    pub risk_free_rate: f64,
    pub beta: f64,
    pub market_return: f64,
}

impl Default for CostOfCapitalConfig {
    fn default() -> Self {
        Self {
            cost_of_equity: 0.10,
            cost_of_debt: 0.05,
            tax_rate: 0.25,
            capm: None,
        }
    }
}

impl CostOfCapitalConfig {
    pub fn cost_of_equity(&self) -> f64 {
        match self.capm {
            Some(c) => capm(c.risk_free_rate, c.beta, c.market_return),
            None => self.cost_of_equity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    pub terminal_growth: RateRange,
    pub discount_rate: RateRange,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            terminal_growth: RateRange::new(0.05, 0.09, 5),
            discount_rate: RateRange::new(0.09, 0.13, 5),
        }
    }
}

impl AppConfig {
    /// Reads `path` when given (a missing file is an error), otherwise the file
    /// named by `DCF_CONFIG` if set, otherwise defaults. Environment overrides
    /// are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("DCF_CONFIG").ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    ValuationError::Configuration(format!(
                        "Failed to read config file {}: {e}",
                        path.display()
                    ))
                })?;
                info!(path = %path.display(), "Loaded configuration file");
                Self::from_toml(&contents)?
            }
            None => {
                debug!("No configuration file given, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(kind) = std::env::var("DCF_DATA_SOURCE") {
            self.data_source.kind = kind.parse()?;
        }
        if let Ok(key) = std::env::var("DCF_FMP_API_KEY") {
            if !key.is_empty() {
                self.data_source.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("DCF_FMP_BASE_URL") {
            if !url.is_empty() {
                self.data_source.base_url = Some(url);
            }
        }
        if let Ok(dir) = std::env::var("DCF_CSV_DIR") {
            if !dir.is_empty() {
                self.data_source.csv_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(period) = std::env::var("DCF_STATEMENT_PERIOD") {
            if !period.is_empty() {
                self.data_source.period = period;
            }
        }
        if let Ok(host) = std::env::var("DCF_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("DCF_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ValuationError::Configuration(format!("DCF_PORT is not a valid port: {port}"))
            })?;
        }
        Ok(())
    }
}
