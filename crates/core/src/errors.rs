//! Core error types for the FolioLedger accounting core.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.
//! Every error maps onto a stable [`ErrorKind`] whose `code()` is what outer
//! surfaces report to callers.

use chrono::{NaiveDate, ParseError as ChronoParseError};
use rust_decimal::Decimal;
use thiserror::Error;

use folioledger_market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the accounting core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Caller is not authenticated")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Accounting violation: {0}")]
    Accounting(#[from] AccountingError),

    #[error("Calculation failed: {0}")]
    Calculation(#[from] CalculatorError),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Accounting invariant violations raised by the projector and lot allocator.
///
/// These surface as conflict-class errors and always roll back the triggering write.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountingError {
    #[error("Insufficient shares of {symbol} on {date}: requested {requested}, available {available}")]
    InsufficientShares {
        symbol: String,
        date: NaiveDate,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient open lots of {symbol}: requested {requested}, available {available}")]
    InsufficientLots {
        symbol: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Invalid lot allocation: {0}")]
    InvalidAllocation(String),
}

/// Errors that occur during return calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculatorError {
    #[error("IRR bisection did not converge after {iterations} iterations")]
    NoConvergence { iterations: u32 },

    #[error("Return is undefined: {0}")]
    UndefinedReturn(String),

    #[error("Calculation failed: {0}")]
    Calculation(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

impl ValidationError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Name of the offending field, when the error is tied to one.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidField { field, .. } => Some(field),
            ValidationError::MissingField(field) => Some(field),
            _ => None,
        }
    }
}

/// Stable error classification reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    InsufficientShares,
    InsufficientLots,
    InvalidAllocation,
    NoConvergence,
    UpstreamUnavailable,
    RateLimited,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::InsufficientShares => "INSUFFICIENT_SHARES",
            ErrorKind::InsufficientLots => "INSUFFICIENT_LOTS",
            ErrorKind::InvalidAllocation => "INVALID_ALLOCATION",
            ErrorKind::NoConvergence => "NO_CONVERGENCE",
            ErrorKind::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Accounting violations are reported in the conflict class with their own code.
    pub fn is_conflict_class(&self) -> bool {
        matches!(
            self,
            ErrorKind::Conflict
                | ErrorKind::InsufficientShares
                | ErrorKind::InsufficientLots
                | ErrorKind::InvalidAllocation
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::InvalidInput(message.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Unauthorized => ErrorKind::Unauthorized,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Accounting(AccountingError::InsufficientShares { .. }) => {
                ErrorKind::InsufficientShares
            }
            Error::Accounting(AccountingError::InsufficientLots { .. }) => {
                ErrorKind::InsufficientLots
            }
            Error::Accounting(AccountingError::InvalidAllocation(_)) => {
                ErrorKind::InvalidAllocation
            }
            Error::Calculation(CalculatorError::NoConvergence { .. }) => ErrorKind::NoConvergence,
            Error::Calculation(_) => ErrorKind::Validation,
            Error::MarketData(e) => match e {
                MarketDataError::SymbolNotFound(_) | MarketDataError::NoDataForRange => {
                    ErrorKind::NotFound
                }
                MarketDataError::RateLimited { .. } => ErrorKind::RateLimited,
                _ => ErrorKind::UpstreamUnavailable,
            },
            Error::Database(DatabaseError::NotFound(_)) => ErrorKind::NotFound,
            Error::Database(DatabaseError::UniqueViolation(_)) => ErrorKind::Conflict,
            Error::Database(_) => ErrorKind::Internal,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::Unexpected(_) => ErrorKind::Internal,
        }
    }
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(format!("Serialization failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Unexpected(err.to_string())
    }
}
