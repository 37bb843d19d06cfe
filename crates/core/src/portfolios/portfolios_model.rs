//! Portfolio domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::PORTFOLIO_NAME_MAX_LEN;
use crate::utils::money::is_valid_currency_code;
use crate::{errors::ValidationError, Error, Result};

/// Lot relief method applied to sells that don't carry explicit lot selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostBasisMethod {
    #[default]
    Fifo,
    Lifo,
    SpecificLot,
}

impl CostBasisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostBasisMethod::Fifo => "FIFO",
            CostBasisMethod::Lifo => "LIFO",
            CostBasisMethod::SpecificLot => "SPECIFIC_LOT",
        }
    }
}

impl fmt::Display for CostBasisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostBasisMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "FIFO" => Ok(CostBasisMethod::Fifo),
            "LIFO" => Ok(CostBasisMethod::Lifo),
            "SPECIFIC_LOT" | "SPECIFIC" => Ok(CostBasisMethod::SpecificLot),
            other => Err(Error::Validation(ValidationError::field(
                "costBasisMethod",
                format!("unknown cost basis method '{}'", other),
            ))),
        }
    }
}

/// Domain model representing a portfolio owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub base_currency: String,
    pub cost_basis_method: CostBasisMethod,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub owner_id: String,
    pub name: String,
    pub base_currency: String,
    #[serde(default)]
    pub cost_basis_method: CostBasisMethod,
}

impl NewPortfolio {
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if !is_valid_currency_code(&self.base_currency) {
            return Err(Error::Validation(ValidationError::field(
                "baseCurrency",
                format!("'{}' is not a 3-letter currency code", self.base_currency),
            )));
        }
        Ok(())
    }
}

/// Input model for updating an existing portfolio. The base currency is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub id: String,
    pub name: String,
    pub cost_basis_method: CostBasisMethod,
}

impl PortfolioUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "id".to_string(),
            )));
        }
        validate_name(&self.name)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(ValidationError::field(
            "name",
            "portfolio name cannot be empty",
        )));
    }
    if trimmed.chars().count() > PORTFOLIO_NAME_MAX_LEN {
        return Err(Error::Validation(ValidationError::field(
            "name",
            format!("portfolio name exceeds {} characters", PORTFOLIO_NAME_MAX_LEN),
        )));
    }
    Ok(())
}
