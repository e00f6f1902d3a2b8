//! Custom error types for pubscout.
//!
//! Every fallible library function returns `Result<T, ScoutError>`.
//! Problems confined to a single record inside a fetched document are not
//! errors at this level: the parser logs and skips them.

use thiserror::Error;

/// Main error type for pubscout operations.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Caller supplied unusable input (empty query, no valid PMIDs, no document)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network/HTTP transport error, including timeouts
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream service answered with a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Status line plus an excerpt of the response body
        message: String,
    },

    /// Upstream payload could not be parsed (JSON or XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl ScoutError {
    /// True for input-validation failures, which are raised before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, ScoutError::Validation(_))
    }
}

/// Result type alias using `ScoutError`
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| ScoutError::Parse(msg.to_string()))
    }
}
