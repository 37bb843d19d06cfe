//! Bulk-import request and result types, plus per-row validation.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::transactions_model::{NewTransaction, Transaction, TransactionType};
use crate::errors::{Error, ValidationError};

/// One normalized row produced by an upstream CSV parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub line: usize,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub commission: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub raw_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    pub line: usize,
    pub field: String,
    pub message: String,
    pub raw_data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub format_tag: String,
    pub records: Vec<ImportRecord>,
    /// Rows the parser already rejected.
    #[serde(default)]
    pub parse_errors: Vec<ImportRowError>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub skip_invalid: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub batch_id: Option<String>,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<ImportRowError>,
    pub dry_run: bool,
}

impl ImportRecord {
    /// Validates the row and builds the ledger entry it describes.
    pub fn to_transaction(
        &self,
        portfolio_id: &str,
        batch_id: &str,
        created_at: NaiveDateTime,
    ) -> std::result::Result<Transaction, ImportRowError> {
        let transaction_type = TransactionType::from_str(&self.transaction_type)
            .map_err(|e| self.row_error(e))?;
        let input = NewTransaction {
            id: None,
            portfolio_id: portfolio_id.to_string(),
            transaction_type,
            symbol: self.symbol.clone(),
            trade_date: self.trade_date,
            quantity: self.quantity,
            price: self.price,
            commission: self.commission,
            currency: self.currency.clone(),
            notes: self.notes.clone(),
            import_batch_id: Some(batch_id.to_string()),
            ratio: None,
            related_symbol: None,
            basis_fraction: None,
            lot_selections: Vec::new(),
            corporate_action_id: None,
        };
        input.validate().map_err(|e| self.row_error(e))?;
        Ok(input.into_transaction(created_at))
    }

    fn row_error(&self, err: Error) -> ImportRowError {
        let (field, message) = match &err {
            Error::Validation(ValidationError::InvalidField { field, message }) => {
                (field.clone(), message.clone())
            }
            Error::Validation(ValidationError::MissingField(field)) => {
                (field.clone(), format!("{} is required", field))
            }
            _ => ("row".to_string(), err.to_string()),
        };
        ImportRowError {
            line: self.line,
            field,
            message,
            raw_data: self.raw_data.clone(),
        }
    }
}
