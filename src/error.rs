//! Unified error hierarchy for pacecast
//!
//! Mirrors the propagation policy of the prediction pipeline: route parsing
//! failures abort the request, data-sparsity failures degrade to documented
//! fallbacks and are only surfaced through logging.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all pacecast operations
#[derive(Debug, Error)]
pub enum PacecastError {
    /// Route file parsing errors
    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    /// Activity/stream data errors
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Model fitting and evaluation errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Route geometry errors
#[derive(Debug, Error)]
pub enum RouteError {
    /// File not found at specified path
    #[error("Route file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// GPX document could not be parsed
    #[error("Unreadable route file: {reason}")]
    Unreadable { reason: String },

    /// Parsed document contains no track points
    #[error("No track points found in route")]
    EmptyRoute,
}

/// Activity data errors
#[derive(Debug, Error)]
pub enum DataError {
    /// Stream JSON is structurally unreadable
    #[error("Unreadable stream data for {stream}: {reason}")]
    UnreadableStream { stream: String, reason: String },

    /// Activity log file could not be parsed
    #[error("Parse error in {format} activity log: {reason}")]
    ParseError { format: String, reason: String },

    /// Required field absent from a record
    #[error("Missing required data: {field}")]
    MissingData { field: String },
}

/// Model fitting errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Not enough observations to fit
    #[error("Insufficient data for {model}: {reason}")]
    InsufficientData { model: String, reason: String },

    /// Parameter outside its physical bounds
    #[error("Invalid parameter for {model}: {parameter}={value}")]
    InvalidParameter {
        model: String,
        parameter: String,
        value: String,
    },

    /// Optimizer failed to produce finite parameters
    #[error("Fit did not converge for {model}")]
    Degenerate { model: String },
}

/// Result type alias for pacecast operations
pub type Result<T> = std::result::Result<T, PacecastError>;

impl PacecastError {
    /// Whether the caller should fall back to a degraded estimate
    /// instead of failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PacecastError::Model(ModelError::InsufficientData { .. })
                | PacecastError::Model(ModelError::Degenerate { .. })
                | PacecastError::Data(DataError::UnreadableStream { .. })
                | PacecastError::Data(DataError::MissingData { .. })
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PacecastError::Model(ModelError::InsufficientData { .. }) => ErrorSeverity::Warning,
            PacecastError::Model(ModelError::Degenerate { .. }) => ErrorSeverity::Warning,
            PacecastError::Data(DataError::UnreadableStream { .. }) => ErrorSeverity::Warning,
            PacecastError::Route(_) => ErrorSeverity::Error,
            PacecastError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PacecastError::Route(RouteError::FileNotFound { path }) => {
                format!("Could not find route file: {}", path.display())
            }
            PacecastError::Route(RouteError::EmptyRoute) => {
                "The route file contains no GPS points.".to_string()
            }
            PacecastError::Model(ModelError::InsufficientData { model, .. }) => {
                format!(
                    "Not enough training history to fit the {}. Import more activities and retry.",
                    model
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical | ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
