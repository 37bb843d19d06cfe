//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Whether a cached value may stand in for a failed fetch

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines whether the cache may serve a stale entry instead.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    /// This is a terminal error - retrying won't help.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// No data available for the requested date range.
    /// The symbol exists but has no quotes in the specified period.
    #[error("No data for date range")]
    NoDataForRange,

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider could not be reached or answered with a server error.
    #[error("Upstream unavailable: {provider} - {message}")]
    UpstreamUnavailable {
        /// The provider that failed
        provider: String,
        /// What went wrong
        message: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// Data validation failed.
    /// The provider returned data that failed validation checks.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use folioledger_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "YAHOO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Transient);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::SymbolNotFound(_)
            | Self::NoDataForRange
            | Self::ValidationFailed { .. } => RetryClass::Never,

            Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::UpstreamUnavailable { .. }
            | Self::ProviderError { .. } => RetryClass::Transient,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.retry_class() == RetryClass::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors_never_retry() {
        assert_eq!(
            MarketDataError::SymbolNotFound("INVALID".to_string()).retry_class(),
            RetryClass::Never
        );
        assert_eq!(MarketDataError::NoDataForRange.retry_class(), RetryClass::Never);
        let error = MarketDataError::ValidationFailed {
            message: "close is NaN".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_upstream_failures_are_transient() {
        let error = MarketDataError::RateLimited {
            provider: "YAHOO".to_string(),
        };
        assert!(error.is_transient());

        let error = MarketDataError::Timeout {
            provider: "YAHOO".to_string(),
        };
        assert!(error.is_transient());

        let error = MarketDataError::UpstreamUnavailable {
            provider: "YAHOO".to_string(),
            message: "503".to_string(),
        };
        assert!(error.is_transient());
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::RateLimited {
            provider: "YAHOO".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: YAHOO");
    }
}
