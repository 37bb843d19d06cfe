//! Corporate-action catalogue and per-portfolio proposal models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::transactions::normalize_symbol;
use crate::utils::decimal_utils::format_ratio;
use crate::utils::money::is_valid_currency_code;
use crate::{errors::ValidationError, Error, Result};

/// Type-discriminated parameters of a corporate action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum CorporateActionKind {
    Split {
        ratio: Decimal,
    },
    Dividend {
        amount: Decimal,
        currency: String,
    },
    Merger {
        ratio: Decimal,
        new_symbol: String,
    },
    Spinoff {
        ratio: Decimal,
        new_symbol: String,
        #[serde(default)]
        basis_fraction: Option<Decimal>,
    },
    TickerChange {
        new_symbol: String,
    },
}

/// Flat column form used by storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorporateActionParts {
    pub action_type: String,
    pub ratio: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub new_symbol: Option<String>,
    pub basis_fraction: Option<Decimal>,
}

impl CorporateActionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            CorporateActionKind::Split { .. } => "SPLIT",
            CorporateActionKind::Dividend { .. } => "DIVIDEND",
            CorporateActionKind::Merger { .. } => "MERGER",
            CorporateActionKind::Spinoff { .. } => "SPINOFF",
            CorporateActionKind::TickerChange { .. } => "TICKER_CHANGE",
        }
    }

    pub fn new_symbol(&self) -> Option<&str> {
        match self {
            CorporateActionKind::Merger { new_symbol, .. }
            | CorporateActionKind::Spinoff { new_symbol, .. }
            | CorporateActionKind::TickerChange { new_symbol } => Some(new_symbol),
            _ => None,
        }
    }

    pub fn to_parts(&self) -> CorporateActionParts {
        let mut parts = CorporateActionParts {
            action_type: self.type_name().to_string(),
            ..Default::default()
        };
        match self {
            CorporateActionKind::Split { ratio } => parts.ratio = Some(*ratio),
            CorporateActionKind::Dividend { amount, currency } => {
                parts.amount = Some(*amount);
                parts.currency = Some(currency.clone());
            }
            CorporateActionKind::Merger { ratio, new_symbol } => {
                parts.ratio = Some(*ratio);
                parts.new_symbol = Some(new_symbol.clone());
            }
            CorporateActionKind::Spinoff {
                ratio,
                new_symbol,
                basis_fraction,
            } => {
                parts.ratio = Some(*ratio);
                parts.new_symbol = Some(new_symbol.clone());
                parts.basis_fraction = *basis_fraction;
            }
            CorporateActionKind::TickerChange { new_symbol } => {
                parts.new_symbol = Some(new_symbol.clone());
            }
        }
        parts
    }

    pub fn from_parts(parts: CorporateActionParts) -> Result<Self> {
        let missing = |field: &str| Error::Validation(ValidationError::MissingField(field.to_string()));
        let kind = match parts.action_type.as_str() {
            "SPLIT" => CorporateActionKind::Split {
                ratio: parts.ratio.ok_or_else(|| missing("ratio"))?,
            },
            "DIVIDEND" => CorporateActionKind::Dividend {
                amount: parts.amount.ok_or_else(|| missing("amount"))?,
                currency: parts.currency.ok_or_else(|| missing("currency"))?,
            },
            "MERGER" => CorporateActionKind::Merger {
                ratio: parts.ratio.ok_or_else(|| missing("ratio"))?,
                new_symbol: parts.new_symbol.ok_or_else(|| missing("newSymbol"))?,
            },
            "SPINOFF" => CorporateActionKind::Spinoff {
                ratio: parts.ratio.ok_or_else(|| missing("ratio"))?,
                new_symbol: parts.new_symbol.ok_or_else(|| missing("newSymbol"))?,
                basis_fraction: parts.basis_fraction,
            },
            "TICKER_CHANGE" => CorporateActionKind::TickerChange {
                new_symbol: parts.new_symbol.ok_or_else(|| missing("newSymbol"))?,
            },
            other => {
                return Err(Error::Validation(ValidationError::field(
                    "type",
                    format!("unknown corporate action type '{}'", other),
                )))
            }
        };
        Ok(kind)
    }

    fn key_params(&self) -> String {
        match self {
            CorporateActionKind::Split { ratio } => ratio.normalize().to_string(),
            CorporateActionKind::Dividend { amount, currency } => {
                format!("{}|{}", amount.normalize(), currency)
            }
            CorporateActionKind::Merger { ratio, new_symbol } => {
                format!("{}|{}", ratio.normalize(), new_symbol)
            }
            CorporateActionKind::Spinoff {
                ratio,
                new_symbol,
                basis_fraction,
            } => format!(
                "{}|{}|{}",
                ratio.normalize(),
                new_symbol,
                basis_fraction
                    .map(|f| f.normalize().to_string())
                    .unwrap_or_default()
            ),
            CorporateActionKind::TickerChange { new_symbol } => new_symbol.clone(),
        }
    }
}

/// Global per-symbol event, shared by the proposals that reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorporateAction {
    pub id: String,
    pub symbol: String,
    pub ex_date: NaiveDate,
    #[serde(flatten)]
    pub kind: CorporateActionKind,
    /// Set once no portfolio has an open proposal left for the action.
    pub applied: bool,
    pub created_at: NaiveDateTime,
}

impl CorporateAction {
    pub fn dedupe_key(&self) -> String {
        dedupe_key(&self.symbol, self.ex_date, &self.kind)
    }
}

/// Uniqueness key over (symbol, type, ex-date, key parameters).
pub fn dedupe_key(symbol: &str, ex_date: NaiveDate, kind: &CorporateActionKind) -> String {
    format!(
        "{}|{}|{}|{}",
        symbol,
        kind.type_name(),
        ex_date.format("%Y-%m-%d"),
        kind.key_params()
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCorporateAction {
    pub symbol: String,
    pub ex_date: NaiveDate,
    #[serde(flatten)]
    pub kind: CorporateActionKind,
}

impl NewCorporateAction {
    pub fn validate(&self) -> Result<()> {
        let symbol = normalize_symbol(&self.symbol);
        if symbol.is_empty() {
            return Err(invalid("symbol", "symbol is required"));
        }
        let check_ratio = |ratio: &Decimal| {
            if *ratio <= Decimal::ZERO {
                Err(invalid("ratio", "ratio must be greater than zero"))
            } else {
                Ok(())
            }
        };
        let check_new_symbol = |new_symbol: &str| {
            let new_symbol = normalize_symbol(new_symbol);
            if new_symbol.is_empty() {
                Err(invalid("newSymbol", "new symbol is required"))
            } else if new_symbol == symbol {
                Err(invalid("newSymbol", "new symbol must differ from symbol"))
            } else {
                Ok(())
            }
        };

        match &self.kind {
            CorporateActionKind::Split { ratio } => {
                check_ratio(ratio)?;
                if *ratio == Decimal::ONE {
                    return Err(invalid("ratio", "a 1:1 split changes nothing"));
                }
            }
            CorporateActionKind::Dividend { amount, currency } => {
                if *amount <= Decimal::ZERO {
                    return Err(invalid("amount", "dividend amount must be greater than zero"));
                }
                if !is_valid_currency_code(currency.trim()) {
                    return Err(invalid("currency", "a 3-letter currency code is required"));
                }
            }
            CorporateActionKind::Merger { ratio, new_symbol } => {
                check_ratio(ratio)?;
                check_new_symbol(new_symbol)?;
            }
            CorporateActionKind::Spinoff {
                ratio,
                new_symbol,
                basis_fraction,
            } => {
                check_ratio(ratio)?;
                check_new_symbol(new_symbol)?;
                if let Some(fraction) = basis_fraction {
                    if *fraction <= Decimal::ZERO || *fraction >= Decimal::ONE {
                        return Err(invalid(
                            "basisFraction",
                            "basis fraction must be within (0, 1)",
                        ));
                    }
                }
            }
            CorporateActionKind::TickerChange { new_symbol } => check_new_symbol(new_symbol)?,
        }
        Ok(())
    }

    /// Symbols upper-cased and currency normalized, so equal events share a dedupe key.
    pub fn normalized(self) -> NewCorporateAction {
        let kind = match self.kind {
            CorporateActionKind::Dividend { amount, currency } => CorporateActionKind::Dividend {
                amount,
                currency: currency.trim().to_uppercase(),
            },
            CorporateActionKind::Merger { ratio, new_symbol } => CorporateActionKind::Merger {
                ratio,
                new_symbol: normalize_symbol(&new_symbol),
            },
            CorporateActionKind::Spinoff {
                ratio,
                new_symbol,
                basis_fraction,
            } => CorporateActionKind::Spinoff {
                ratio,
                new_symbol: normalize_symbol(&new_symbol),
                basis_fraction,
            },
            CorporateActionKind::TickerChange { new_symbol } => CorporateActionKind::TickerChange {
                new_symbol: normalize_symbol(&new_symbol),
            },
            split @ CorporateActionKind::Split { .. } => split,
        };
        NewCorporateAction {
            symbol: normalize_symbol(&self.symbol),
            ex_date: self.ex_date,
            kind,
        }
    }

    pub fn dedupe_key(&self) -> String {
        dedupe_key(&self.symbol, self.ex_date, &self.kind)
    }

    pub fn into_action(self, created_at: NaiveDateTime) -> CorporateAction {
        CorporateAction {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: self.symbol,
            ex_date: self.ex_date,
            kind: self.kind,
            applied: false,
            created_at,
        }
    }
}

fn invalid(field: &str, message: &str) -> Error {
    Error::Validation(ValidationError::field(field, message))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Applied,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "PENDING",
            ProposalStatus::Approved => "APPROVED",
            ProposalStatus::Rejected => "REJECTED",
            ProposalStatus::Applied => "APPLIED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Rejected | ProposalStatus::Applied)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(ProposalStatus::Pending),
            "APPROVED" => Ok(ProposalStatus::Approved),
            "REJECTED" => Ok(ProposalStatus::Rejected),
            "APPLIED" => Ok(ProposalStatus::Applied),
            other => Err(Error::Validation(ValidationError::field(
                "status",
                format!("unknown proposal status '{}'", other),
            ))),
        }
    }
}

/// Reviewable intent to apply one corporate action to one portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAction {
    pub id: String,
    pub portfolio_id: String,
    pub corporate_action_id: String,
    pub status: ProposalStatus,
    pub affected_symbol: String,
    /// Shares held at the ex-date when the proposal was detected.
    pub shares_affected: Decimal,
    pub description: String,
    pub detected_at: NaiveDateTime,
    pub reviewed_at: Option<NaiveDateTime>,
    pub applied_at: Option<NaiveDateTime>,
}

impl PortfolioAction {
    pub fn pending(
        portfolio_id: &str,
        action: &CorporateAction,
        shares: Decimal,
        detected_at: NaiveDateTime,
    ) -> Self {
        PortfolioAction {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.to_string(),
            corporate_action_id: action.id.clone(),
            status: ProposalStatus::Pending,
            affected_symbol: action.symbol.clone(),
            shares_affected: shares,
            description: describe(action, shares),
            detected_at,
            reviewed_at: None,
            applied_at: None,
        }
    }
}

/// Human-readable summary, e.g. "Stock split 2:1 on AAPL affects 100 shares".
pub fn describe(action: &CorporateAction, shares: Decimal) -> String {
    let shares = shares.normalize();
    let symbol = &action.symbol;
    match &action.kind {
        CorporateActionKind::Split { ratio } => format!(
            "Stock split {} on {} affects {} shares",
            format_ratio(*ratio),
            symbol,
            shares
        ),
        CorporateActionKind::Dividend { amount, currency } => format!(
            "Cash dividend of {} {} per share on {} affects {} shares",
            amount.normalize(),
            currency,
            symbol,
            shares
        ),
        CorporateActionKind::Merger { ratio, new_symbol } => format!(
            "Merger of {} into {} at {} shares per share affects {} shares",
            symbol,
            new_symbol,
            ratio.normalize(),
            shares
        ),
        CorporateActionKind::Spinoff {
            ratio, new_symbol, ..
        } => format!(
            "Spinoff of {} from {} at {} shares per share affects {} shares",
            new_symbol,
            symbol,
            ratio.normalize(),
            shares
        ),
        CorporateActionKind::TickerChange { new_symbol } => format!(
            "Ticker change from {} to {} affects {} shares",
            symbol, new_symbol, shares
        ),
    }
}
