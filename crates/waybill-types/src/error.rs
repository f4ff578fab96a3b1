//! Error types for waybill allocation

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Rejected user input. The operation is aborted and prior state is kept.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Rate must be set before entering CBM")]
    RateNotSet,

    #[error("Consignee already exists on this waybill: {0}")]
    DuplicateConsignee(String),

    #[error("{field} cannot be negative (got {value})")]
    NegativeValue { field: String, value: f64 },

    #[error("Percentage must be between 0 and 100 (got {0})")]
    PercentageOutOfRange(f64),

    #[error("Truck capacity of {truck_cbm} CBM is already full")]
    CapacityFull { truck_cbm: f64 },

    #[error("{requested} CBM exceeds remaining capacity of {remaining} CBM")]
    CapacityExceeded { requested: f64, remaining: f64 },

    #[error("Drop not found: {0}")]
    DropNotFound(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Cannot {action} entity {entity} while it is {status}")]
    InvalidTransition {
        entity: String,
        status: String,
        action: String,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Failures talking to the remote waybill API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode API response: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Waybill not found: {0}")]
    WaybillNotFound(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Excel export error: {0}")]
    Excel(String),
}

impl Error {
    /// Message suitable for showing to an operator.
    ///
    /// Validation errors are shown verbatim; transport failures collapse to a
    /// generic message and are retried only when the user re-triggers them.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(e) => e.to_string(),
            Error::Api(_) => "Could not reach the waybill service. Please try again.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
