use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use folioledger_market_data::{MarketDataAdapter, MarketDataError};

use super::flow_classifier::{external_flows, CashFlow};
use super::performance_model::{
    BenchmarkComparison, PerformanceMetrics, PerformanceWindow, ReturnMetric,
};
use super::performance_traits::PerformanceServiceTrait;
use super::returns_calculator::{
    annualize, annualized_return, money_weighted_return, time_weighted_return, FlowPoint,
    ValuePoint,
};
use crate::errors::{Error, Result, ValidationError};
use crate::portfolio::snapshot::SnapshotRepositoryTrait;
use crate::portfolio::valuation::{PriceBook, ValuationService};
use crate::portfolios::{Portfolio, PortfolioAccess};
use crate::transactions::{Transaction, TransactionRepositoryTrait};
use crate::utils::decimal_utils::{ratio_to_percent, round_intermediate};
use crate::utils::time_utils::{days_between, today_utc};

/// Values and flows of one resolved window.
#[derive(Debug, Clone)]
struct WindowSeries {
    start: ValuePoint,
    end: ValuePoint,
    flows: Vec<CashFlow>,
    flow_points: Vec<FlowPoint>,
}

impl WindowSeries {
    fn days(&self) -> i64 {
        days_between(self.start.date, self.end.date)
    }

    fn twr(&self) -> Result<Decimal> {
        Ok(time_weighted_return(self.start, &self.flow_points, self.end)?)
    }

    fn mwr(&self) -> Result<Decimal> {
        Ok(money_weighted_return(self.start, &self.flows, self.end)?)
    }
}

pub struct PerformanceService {
    access: PortfolioAccess,
    transactions: Arc<dyn TransactionRepositoryTrait>,
    snapshots: Arc<dyn SnapshotRepositoryTrait>,
    valuation: ValuationService,
    market_data: Arc<dyn MarketDataAdapter>,
}

impl PerformanceService {
    pub fn new(
        access: PortfolioAccess,
        transactions: Arc<dyn TransactionRepositoryTrait>,
        snapshots: Arc<dyn SnapshotRepositoryTrait>,
        valuation: ValuationService,
        market_data: Arc<dyn MarketDataAdapter>,
    ) -> Self {
        Self {
            access,
            transactions,
            snapshots,
            valuation,
            market_data,
        }
    }

    fn resolve_window(
        &self,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<(NaiveDate, NaiveDate)> {
        let today = today_utc();
        let start = match window.start {
            Some(start) => start,
            None => self
                .transactions
                .first_trade_date(portfolio_id)?
                .unwrap_or(today),
        };
        let end = window.end.unwrap_or(today);
        if start > end {
            return Err(Error::Validation(ValidationError::field(
                "startDate",
                format!("window start {} is after end {}", start, end),
            )));
        }
        Ok((start, end))
    }

    /// End-of-day values for `dates`, read from snapshots where one exists and
    /// re-priced otherwise.
    async fn values_on(
        &self,
        portfolio: &Portfolio,
        ledger: &[Transaction],
        dates: &BTreeSet<NaiveDate>,
    ) -> Result<BTreeMap<NaiveDate, Decimal>> {
        let mut values = BTreeMap::new();
        let mut missing = Vec::new();
        for date in dates {
            match self.snapshots.get(&portfolio.id, *date)? {
                Some(snapshot) => {
                    values.insert(*date, snapshot.total_value);
                }
                None => missing.push(*date),
            }
        }
        debug!(
            "Portfolio {}: {} values from snapshots, {} re-priced",
            portfolio.id,
            values.len(),
            missing.len()
        );
        for valuation in self
            .valuation
            .value_on_dates(portfolio, ledger, &missing)
            .await?
        {
            values.insert(valuation.valuation_date, valuation.total_value);
        }
        Ok(values)
    }

    async fn series(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<WindowSeries> {
        let portfolio = self.access.authorize(user_id, portfolio_id)?;
        let (start, end) = self.resolve_window(portfolio_id, window)?;
        let ledger = self.transactions.list_by_portfolio(portfolio_id)?;

        // Flows on the start date are already inside the start value.
        let flows = external_flows(&ledger, start, end);
        let mut dates: BTreeSet<NaiveDate> = flows.iter().map(|flow| flow.date).collect();
        dates.insert(start);
        dates.insert(end);
        let values = self.values_on(&portfolio, &ledger, &dates).await?;
        let value_at = |date: NaiveDate| -> Result<Decimal> {
            values
                .get(&date)
                .copied()
                .ok_or_else(|| Error::Unexpected(format!("no value for {}", date)))
        };

        let flow_points = flows
            .iter()
            .map(|flow| {
                Ok(FlowPoint {
                    date: flow.date,
                    flow: flow.amount,
                    value_after: value_at(flow.date)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(WindowSeries {
            start: ValuePoint {
                date: start,
                value: value_at(start)?,
            },
            end: ValuePoint {
                date: end,
                value: value_at(end)?,
            },
            flows,
            flow_points,
        })
    }

    fn metric(portfolio_id: &str, series: &WindowSeries, rate: Decimal) -> ReturnMetric {
        ReturnMetric {
            portfolio_id: portfolio_id.to_string(),
            start_date: series.start.date,
            end_date: series.end.date,
            rate,
            percent: ratio_to_percent(rate),
        }
    }

    /// Buy-and-hold return of `symbol` between the window's ends.
    async fn benchmark_return(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal> {
        let symbols = [symbol.to_string()];
        let prices = PriceBook::load(self.market_data.as_ref(), &symbols, start, end).await;
        let (Some((_, start_price)), Some((_, end_price))) =
            (prices.price_on(symbol, start), prices.price_on(symbol, end))
        else {
            return Err(MarketDataError::NoDataForRange.into());
        };
        if start_price <= Decimal::ZERO {
            return Err(Error::invalid(format!(
                "benchmark {} has no positive close on {}",
                symbol, start
            )));
        }
        Ok(round_intermediate(end_price / start_price - Decimal::ONE))
    }
}

fn optional_pct(label: &str, portfolio_id: &str, result: Result<Decimal>) -> Option<Decimal> {
    match result {
        Ok(rate) => Some(ratio_to_percent(rate)),
        Err(e) => {
            debug!("{} undefined for portfolio {}: {}", label, portfolio_id, e);
            None
        }
    }
}

#[async_trait]
impl PerformanceServiceTrait for PerformanceService {
    async fn metrics(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<PerformanceMetrics> {
        let series = self.series(user_id, portfolio_id, window).await?;

        let net_flows: Decimal = series.flows.iter().map(|flow| flow.amount).sum();
        let contributions: Decimal = series
            .flows
            .iter()
            .map(|flow| flow.amount)
            .filter(|amount| *amount > Decimal::ZERO)
            .sum();
        let total_return = round_intermediate(series.end.value - series.start.value - net_flows);
        let invested = series.start.value + contributions;
        let total_return_pct = if invested > Decimal::ZERO {
            Some(ratio_to_percent(total_return / invested))
        } else {
            None
        };

        let twr = series.twr();
        let annualized_twr_pct = twr.as_ref().ok().and_then(|rate| {
            optional_pct(
                "Annualized TWR",
                portfolio_id,
                annualize(*rate, series.days()).map_err(Error::from),
            )
        });

        Ok(PerformanceMetrics {
            portfolio_id: portfolio_id.to_string(),
            start_date: series.start.date,
            end_date: series.end.date,
            start_value: series.start.value,
            end_value: series.end.value,
            net_flows: round_intermediate(net_flows),
            total_return,
            total_return_pct,
            twr_pct: optional_pct("TWR", portfolio_id, twr),
            mwr_pct: optional_pct("MWR", portfolio_id, series.mwr()),
            annualized_twr_pct,
            annualized_return_pct: optional_pct(
                "Annualized return",
                portfolio_id,
                annualized_return(series.start, series.end).map_err(Error::from),
            ),
        })
    }

    async fn twr(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<ReturnMetric> {
        let series = self.series(user_id, portfolio_id, window).await?;
        let rate = series.twr()?;
        Ok(Self::metric(portfolio_id, &series, rate))
    }

    async fn mwr(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<ReturnMetric> {
        let series = self.series(user_id, portfolio_id, window).await?;
        let rate = series.mwr()?;
        Ok(Self::metric(portfolio_id, &series, rate))
    }

    async fn annualized(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<ReturnMetric> {
        let series = self.series(user_id, portfolio_id, window).await?;
        let rate = annualized_return(series.start, series.end)?;
        Ok(Self::metric(portfolio_id, &series, rate))
    }

    async fn benchmark(
        &self,
        user_id: &str,
        portfolio_id: &str,
        benchmark_symbol: &str,
        window: PerformanceWindow,
    ) -> Result<BenchmarkComparison> {
        let symbol = benchmark_symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "benchmarkSymbol".to_string(),
            )));
        }
        let series = self.series(user_id, portfolio_id, window).await?;
        let portfolio_twr = series.twr()?;
        let benchmark_twr = self
            .benchmark_return(&symbol, series.start.date, series.end.date)
            .await?;

        let portfolio_annualized = annualize(portfolio_twr, series.days()).ok();
        let benchmark_annualized = annualize(benchmark_twr, series.days()).ok();
        let outperformance = match (portfolio_annualized, benchmark_annualized) {
            (Some(portfolio), Some(benchmark)) => Some(ratio_to_percent(portfolio - benchmark)),
            _ => None,
        };

        Ok(BenchmarkComparison {
            portfolio_id: portfolio_id.to_string(),
            benchmark_symbol: symbol,
            start_date: series.start.date,
            end_date: series.end.date,
            portfolio_twr_pct: ratio_to_percent(portfolio_twr),
            benchmark_twr_pct: ratio_to_percent(benchmark_twr),
            portfolio_annualized_pct: portfolio_annualized.map(ratio_to_percent),
            benchmark_annualized_pct: benchmark_annualized.map(ratio_to_percent),
            outperformance_pct: outperformance,
            alpha_pct: outperformance,
        })
    }
}
