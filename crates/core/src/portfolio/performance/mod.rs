//! Performance module - external flows, TWR/MWR and benchmark comparison.

mod flow_classifier;
mod performance_model;
mod performance_service;
mod performance_traits;
mod returns_calculator;

pub use flow_classifier::{classify_flow, external_flows, is_external_flow, CashFlow};
pub use performance_model::{
    BenchmarkComparison, PerformanceMetrics, PerformanceWindow, ReturnMetric,
};
pub use performance_service::PerformanceService;
pub use performance_traits::PerformanceServiceTrait;
pub use returns_calculator::{
    annualize, annualized_return, money_weighted_return, time_weighted_return, FlowPoint,
    ValuePoint,
};
