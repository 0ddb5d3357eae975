use thiserror::Error;

/// Main error type for the order bot
#[derive(Error, Debug)]
pub enum AutobuyError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Watchlist is missing required columns: {missing:?}")]
    WatchlistSchema { missing: Vec<String> },

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // Broker errors
    #[error("Broker API error: {0}")]
    Broker(String),

    #[error("Invalid broker response: {0}")]
    InvalidResponse(String),

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for AutobuyError
pub type Result<T> = std::result::Result<T, AutobuyError>;

impl AutobuyError {
    /// Errors that describe a broken operator setup rather than a broker hiccup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AutobuyError::Config(_)
                | AutobuyError::WatchlistSchema { .. }
                | AutobuyError::Csv(_)
                | AutobuyError::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchlist_schema_error_lists_columns() {
        let err = AutobuyError::WatchlistSchema {
            missing: vec!["quantity".to_string(), "is_active".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("quantity"));
        assert!(msg.contains("is_active"));
        assert!(err.is_configuration());
    }

    #[test]
    fn broker_errors_are_not_configuration() {
        assert!(!AutobuyError::Broker("Insufficient funds".into()).is_configuration());
        assert!(!AutobuyError::RateLimited("429".into()).is_configuration());
    }
}
