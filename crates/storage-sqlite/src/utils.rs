//! Helpers for working with SQLite.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite caps bound parameters per statement (SQLITE_MAX_VARIABLE_NUMBER,
/// typically 999); 500 leaves room for the query's other parameters.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into smaller slices for batch SQLite queries.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(column: &str, value: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        StorageError::SerializationError(format!("{} '{}' is not a date: {}", column, value, e))
    })
}

pub fn parse_decimal(column: &str, value: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(value).map_err(|e| {
        StorageError::SerializationError(format!("{} '{}' is not a decimal: {}", column, value, e))
    })
}

pub fn parse_optional_decimal(
    column: &str,
    value: Option<&str>,
) -> Result<Option<Decimal>, StorageError> {
    value.map(|v| parse_decimal(column, v)).transpose()
}
