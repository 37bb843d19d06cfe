use async_trait::async_trait;

use super::performance_model::{
    BenchmarkComparison, PerformanceMetrics, PerformanceWindow, ReturnMetric,
};
use crate::errors::Result;

#[async_trait]
pub trait PerformanceServiceTrait: Send + Sync {
    async fn metrics(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<PerformanceMetrics>;

    async fn twr(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<ReturnMetric>;

    /// Fails with NO_CONVERGENCE when the IRR bisection has no root.
    async fn mwr(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<ReturnMetric>;

    async fn annualized(
        &self,
        user_id: &str,
        portfolio_id: &str,
        window: PerformanceWindow,
    ) -> Result<ReturnMetric>;

    async fn benchmark(
        &self,
        user_id: &str,
        portfolio_id: &str,
        benchmark_symbol: &str,
        window: PerformanceWindow,
    ) -> Result<BenchmarkComparison>;
}
