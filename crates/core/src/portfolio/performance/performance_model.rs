use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closed `[start, end]` window. Missing ends default to the first trade date and today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl PerformanceWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }
}

/// A single return figure. `rate` is the intermediate-scale ratio, `percent` its presentation form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnMetric {
    pub portfolio_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rate: Decimal,
    pub percent: Decimal,
}

/// Full performance picture over a window. Returns that are undefined for
/// the window (empty start value, sub-day span, no IRR root) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub portfolio_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: Decimal,
    pub end_value: Decimal,
    /// Contributions minus withdrawals and dividends paid out inside the window.
    pub net_flows: Decimal,
    pub total_return: Decimal,
    pub total_return_pct: Option<Decimal>,
    pub twr_pct: Option<Decimal>,
    pub mwr_pct: Option<Decimal>,
    pub annualized_twr_pct: Option<Decimal>,
    pub annualized_return_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkComparison {
    pub portfolio_id: String,
    pub benchmark_symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub portfolio_twr_pct: Decimal,
    pub benchmark_twr_pct: Decimal,
    pub portfolio_annualized_pct: Option<Decimal>,
    pub benchmark_annualized_pct: Option<Decimal>,
    pub outperformance_pct: Option<Decimal>,
    /// Reported identically to outperformance.
    pub alpha_pct: Option<Decimal>,
}
