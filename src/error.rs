use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValuationError>;

#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Financial data error: {0}")]
    FinancialData(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ValuationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub(crate) fn missing(message: impl Into<String>) -> Self {
        Self::MissingInput(message.into())
    }
}
