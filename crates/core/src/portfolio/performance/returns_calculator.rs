//! Time- and money-weighted returns over a closed date window.
//!
//! Values are end-of-day portfolio values. Decimal arithmetic is used
//! throughout except inside the IRR bisection and annualization, whose float
//! results are re-materialized at intermediate scale.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::flow_classifier::CashFlow;
use crate::constants::{
    DAYS_PER_YEAR, IRR_DAY_COUNT, IRR_LOWER_BOUND, IRR_MAX_ITERATIONS, IRR_TOLERANCE,
    IRR_UPPER_BOUND,
};
use crate::errors::CalculatorError;
use crate::utils::decimal_utils::{from_f64, round_intermediate, to_f64};

type CalcResult<T> = std::result::Result<T, CalculatorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// End-of-day value on a day with an external flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPoint {
    pub date: NaiveDate,
    pub flow: Decimal,
    /// Value including the day's flow.
    pub value_after: Decimal,
}

/// Chains sub-period returns split at every flow date.
///
/// Each sub-period runs from the previous value-after-flow to the next
/// value-before-flow. Flows on the start date are already part of `start`.
/// A sub-period that starts from nothing (before the first buy, or after a
/// full liquidation) is neutral and chaining restarts at the next value.
pub fn time_weighted_return(
    start: ValuePoint,
    points: &[FlowPoint],
    end: ValuePoint,
) -> CalcResult<Decimal> {
    let mut growth = Decimal::ONE;
    let mut base = start.value;
    let mut measured = false;

    for point in points {
        if let Some(factor) = sub_period_growth(base, point.value_after - point.flow) {
            growth = round_intermediate(growth * factor);
            measured = true;
        }
        base = point.value_after;
    }
    let last_date = points.last().map_or(start.date, |point| point.date);
    if last_date < end.date {
        if let Some(factor) = sub_period_growth(base, end.value) {
            growth = round_intermediate(growth * factor);
            measured = true;
        }
    } else if !base.is_zero() {
        measured = true;
    }
    if !measured {
        return Err(CalculatorError::UndefinedReturn(format!(
            "no value held between {} and {}",
            start.date, end.date
        )));
    }
    Ok(growth - Decimal::ONE)
}

/// Growth factor of one sub-period, `None` when it starts from zero.
fn sub_period_growth(base: Decimal, before_flow: Decimal) -> Option<Decimal> {
    if base.is_zero() {
        None
    } else {
        Some(before_flow / base)
    }
}

/// Solves `Σ CF_k · (1 + r)^((end − t_k) / 365) = V_end` for `r` by bisection.
///
/// The start value counts as a contribution on the start date.
pub fn money_weighted_return(
    start: ValuePoint,
    flows: &[CashFlow],
    end: ValuePoint,
) -> CalcResult<Decimal> {
    let mut cash_flows: Vec<(f64, f64)> = Vec::with_capacity(flows.len() + 1);
    cash_flows.push((years_to(start.date, end.date), to_f64(start.value)));
    for flow in flows {
        cash_flows.push((years_to(flow.date, end.date), to_f64(flow.amount)));
    }
    if cash_flows.iter().all(|(_, amount)| *amount == 0.0) {
        return Err(CalculatorError::UndefinedReturn(
            "no value or flows in the window".to_string(),
        ));
    }
    let end_value = to_f64(end.value);
    let residual = |rate: f64| -> f64 {
        cash_flows
            .iter()
            .map(|(exponent, amount)| amount * (1.0 + rate).powf(*exponent))
            .sum::<f64>()
            - end_value
    };

    let rate = bisect(residual)?;
    from_f64(rate).ok_or_else(|| CalculatorError::Calculation(format!("IRR {} is not finite", rate)))
}

fn years_to(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / IRR_DAY_COUNT
}

fn bisect(f: impl Fn(f64) -> f64) -> CalcResult<f64> {
    let (mut lo, mut hi) = (IRR_LOWER_BOUND, IRR_UPPER_BOUND);
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if f_lo.abs() < IRR_TOLERANCE {
        return Ok(lo);
    }
    if f_hi.abs() < IRR_TOLERANCE {
        return Ok(hi);
    }
    if !f_lo.is_finite() || !f_hi.is_finite() || f_lo.signum() == f_hi.signum() {
        return Err(CalculatorError::NoConvergence { iterations: 0 });
    }

    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let f_mid = f(mid);
        if f_mid.abs() < IRR_TOLERANCE || (hi - lo) / 2.0 < IRR_TOLERANCE {
            return Ok(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Err(CalculatorError::NoConvergence {
        iterations: IRR_MAX_ITERATIONS,
    })
}

/// Converts a total return over `days` into a yearly rate.
pub fn annualize(total_return: Decimal, days: i64) -> CalcResult<Decimal> {
    if days < 1 {
        return Err(CalculatorError::UndefinedReturn(
            "window shorter than one day".to_string(),
        ));
    }
    let growth = to_f64(Decimal::ONE + total_return);
    if growth <= 0.0 {
        return Err(CalculatorError::UndefinedReturn(
            "growth factor is not positive".to_string(),
        ));
    }
    let years = days as f64 / DAYS_PER_YEAR;
    let rate = growth.powf(1.0 / years) - 1.0;
    from_f64(rate).ok_or_else(|| {
        CalculatorError::Calculation(format!("annualized return {} is not finite", rate))
    })
}

/// `(V_end / V_start)^(1 / years) − 1`.
pub fn annualized_return(start: ValuePoint, end: ValuePoint) -> CalcResult<Decimal> {
    if start.value <= Decimal::ZERO {
        return Err(CalculatorError::UndefinedReturn(
            "start value is not positive".to_string(),
        ));
    }
    annualize(end.value / start.value - Decimal::ONE, (end.date - start.date).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn point(date: NaiveDate, value: Decimal) -> ValuePoint {
        ValuePoint { date, value }
    }

    #[test]
    fn test_twr_with_mid_window_deposit() {
        let twr = time_weighted_return(
            point(d(2024, 1, 1), dec!(10000)),
            &[FlowPoint {
                date: d(2024, 7, 1),
                flow: dec!(5000),
                value_after: dec!(17000),
            }],
            point(d(2024, 12, 31), dec!(18000)),
        )
        .unwrap();
        assert_eq!(twr.round_dp(4), dec!(0.2706));
    }

    #[test]
    fn test_mwr_with_mid_window_deposit() {
        // The days/365 exponent puts the IRR near 24.25% for these flows.
        let mwr = money_weighted_return(
            point(d(2024, 1, 1), dec!(10000)),
            &[CashFlow {
                date: d(2024, 7, 1),
                amount: dec!(5000),
            }],
            point(d(2024, 12, 31), dec!(18000)),
        )
        .unwrap();
        assert!(mwr > dec!(0.24) && mwr < dec!(0.25), "mwr = {}", mwr);
    }

    #[test]
    fn test_twr_and_mwr_equal_total_return_without_flows() {
        let start = point(d(2023, 1, 1), dec!(1000));
        let end = point(d(2024, 1, 1), dec!(1100));
        let twr = time_weighted_return(start, &[], end).unwrap();
        let mwr = money_weighted_return(start, &[], end).unwrap();
        assert_eq!(twr, dec!(0.1));
        assert!((mwr - dec!(0.1)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_flow_on_end_date_closes_the_last_sub_period() {
        let twr = time_weighted_return(
            point(d(2024, 1, 1), dec!(100)),
            &[FlowPoint {
                date: d(2024, 2, 1),
                flow: dec!(50),
                value_after: dec!(160),
            }],
            point(d(2024, 2, 1), dec!(160)),
        )
        .unwrap();
        assert_eq!(twr, dec!(0.1));
    }

    #[test]
    fn test_twr_is_undefined_when_nothing_is_ever_held() {
        let err = time_weighted_return(
            point(d(2024, 1, 1), dec!(0)),
            &[],
            point(d(2024, 2, 1), dec!(10)),
        )
        .unwrap_err();
        assert!(matches!(err, CalculatorError::UndefinedReturn(_)));
    }

    #[test]
    fn test_twr_window_starting_before_first_trade() {
        let twr = time_weighted_return(
            point(d(2024, 1, 1), dec!(0)),
            &[FlowPoint {
                date: d(2024, 1, 2),
                flow: dec!(1000),
                value_after: dec!(1010),
            }],
            point(d(2024, 12, 31), dec!(1100)),
        )
        .unwrap();
        // Only the period after the first buy counts: 1100 / 1010.
        assert_eq!(twr.round_dp(6), dec!(0.089109));
    }

    #[test]
    fn test_twr_restarts_after_full_liquidation() {
        let twr = time_weighted_return(
            point(d(2024, 1, 1), dec!(1000)),
            &[
                FlowPoint {
                    date: d(2024, 3, 1),
                    flow: dec!(-1100),
                    value_after: dec!(0),
                },
                FlowPoint {
                    date: d(2024, 6, 1),
                    flow: dec!(500),
                    value_after: dec!(505),
                },
            ],
            point(d(2024, 12, 31), dec!(550)),
        )
        .unwrap();
        // 1100 / 1000 chained with 550 / 505.
        assert_eq!(twr.round_dp(6), dec!(0.198020));
    }

    #[test]
    fn test_mwr_without_sign_change_fails_cleanly() {
        // Value grows far beyond what any rate in the bracket explains.
        let err = money_weighted_return(
            point(d(2024, 1, 1), dec!(1)),
            &[],
            point(d(2024, 1, 2), dec!(1000000)),
        )
        .unwrap_err();
        assert!(matches!(err, CalculatorError::NoConvergence { .. }));
    }

    #[test]
    fn test_annualized_return() {
        let start = point(d(2022, 1, 1), dec!(100));
        let end = point(d(2024, 1, 1), dec!(121));
        let annualized = annualized_return(start, end).unwrap();
        assert!((annualized - dec!(0.1)).abs() < dec!(0.001));

        assert!(annualized_return(point(d(2024, 1, 1), dec!(0)), end).is_err());
        assert!(annualize(dec!(0.1), 0).is_err());
    }
}
