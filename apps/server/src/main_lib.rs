use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use folioledger_core::{
    corporate_actions::{CorporateActionService, CorporateActionServiceTrait},
    jobs::{
        CleanupJob, CorporateActionDetectionJob, PriceRefreshJob, Scheduler, SchedulerConfig,
        SnapshotJob,
    },
    portfolio::{
        holdings::{HoldingRepositoryTrait, HoldingsService, HoldingsServiceTrait},
        performance::{PerformanceService, PerformanceServiceTrait},
        snapshot::{SnapshotService, SnapshotServiceTrait},
        tax_lots::{TaxLotService, TaxLotServiceTrait},
        valuation::ValuationService,
    },
    portfolios::{PortfolioAccess, PortfolioLocks, PortfolioService, PortfolioServiceTrait},
    transactions::{LedgerWriter, TransactionService, TransactionServiceTrait},
    users::{SessionTokenRepositoryTrait, UserService, UserServiceTrait},
};
use folioledger_market_data::{
    CachedMarketData, MarketDataAdapter, MarketDataProvider, StaticProvider, YahooProvider,
};
use folioledger_storage_sqlite::{
    corporate_actions::CorporateActionRepository,
    open,
    portfolio::{holdings::HoldingRepository, snapshot::SnapshotRepository},
    portfolios::PortfolioRepository,
    transactions::TransactionRepository,
    users::{SessionTokenRepository, UserRepository},
};

use crate::config::{Config, LogFormat, ProviderKind};

/// Everything the daemon wires together at start-up.
///
/// The scheduler only needs a few of these; the request-facing services are
/// held here for whatever transport is mounted on top of the core.
pub struct AppState {
    #[allow(dead_code)]
    pub portfolio_service: Arc<dyn PortfolioServiceTrait>,
    #[allow(dead_code)]
    pub transaction_service: Arc<dyn TransactionServiceTrait>,
    #[allow(dead_code)]
    pub holdings_service: Arc<dyn HoldingsServiceTrait>,
    #[allow(dead_code)]
    pub tax_lot_service: Arc<dyn TaxLotServiceTrait>,
    #[allow(dead_code)]
    pub performance_service: Arc<dyn PerformanceServiceTrait>,
    #[allow(dead_code)]
    pub user_service: Arc<dyn UserServiceTrait>,
    pub corporate_action_service: Arc<dyn CorporateActionServiceTrait>,
    pub snapshot_service: Arc<dyn SnapshotServiceTrait>,
    pub holding_repository: Arc<dyn HoldingRepositoryTrait>,
    pub token_repository: Arc<dyn SessionTokenRepositoryTrait>,
    pub market_data: Arc<dyn MarketDataAdapter>,
    pub db_path: String,
}

pub fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // `init` also installs the `log` bridge, so core and storage records land here too.
    match log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

fn build_market_data(config: &Config) -> anyhow::Result<Arc<dyn MarketDataAdapter>> {
    let provider: Arc<dyn MarketDataProvider> = match config.provider {
        ProviderKind::Yahoo => Arc::new(YahooProvider::new(config.quote_currency.clone())?),
        ProviderKind::Static => {
            tracing::warn!("Using the static market data provider; prices must be seeded");
            Arc::new(StaticProvider::new(config.quote_currency.clone()))
        }
    };
    Ok(Arc::new(CachedMarketData::new(provider, config.cache.clone())))
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let (pool, writer) = open(&config.db)?;
    tracing::info!("Database path in use: {}", config.db.path);

    let market_data = build_market_data(config)?;

    let portfolio_repo = Arc::new(PortfolioRepository::new(pool.clone(), writer.clone()));
    let transaction_repo = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let holding_repo = Arc::new(HoldingRepository::new(pool.clone()));
    let action_repo = Arc::new(CorporateActionRepository::new(
        pool.clone(),
        writer.clone(),
    ));
    let snapshot_repo = Arc::new(SnapshotRepository::new(pool.clone(), writer.clone()));
    let user_repo = Arc::new(UserRepository::new(pool.clone(), writer.clone()));
    let token_repo = Arc::new(SessionTokenRepository::new(writer.clone()));

    // One lock table shared by every service so writes to a portfolio serialize.
    let access = PortfolioAccess::new(portfolio_repo, PortfolioLocks::new());
    let valuation = ValuationService::new(market_data.clone());

    let portfolio_service = Arc::new(PortfolioService::new(
        access.clone(),
        LedgerWriter::new(transaction_repo.clone()),
    ));
    let transaction_service = Arc::new(TransactionService::new(
        access.clone(),
        transaction_repo.clone(),
    ));
    let holdings_service = Arc::new(HoldingsService::new(
        access.clone(),
        holding_repo.clone(),
        market_data.clone(),
    ));
    let tax_lot_service = Arc::new(TaxLotService::new(
        access.clone(),
        holding_repo.clone(),
        transaction_repo.clone(),
        market_data.clone(),
    ));
    let snapshot_service = Arc::new(SnapshotService::new(
        access.clone(),
        snapshot_repo.clone(),
        transaction_repo.clone(),
        valuation.clone(),
    ));
    let performance_service = Arc::new(PerformanceService::new(
        access.clone(),
        transaction_repo.clone(),
        snapshot_repo,
        valuation,
        market_data.clone(),
    ));
    let corporate_action_service = Arc::new(CorporateActionService::new(
        access,
        action_repo,
        holding_repo.clone(),
        transaction_repo,
    ));
    let user_service = Arc::new(UserService::new(user_repo));

    Ok(Arc::new(AppState {
        portfolio_service,
        transaction_service,
        holdings_service,
        tax_lot_service,
        performance_service,
        user_service,
        corporate_action_service,
        snapshot_service,
        holding_repository: holding_repo,
        token_repository: token_repo,
        market_data,
        db_path: config.db.path.clone(),
    }))
}

/// Registers the four standing jobs against `state`.
pub fn build_scheduler(state: &AppState, config: &SchedulerConfig) -> Scheduler {
    let mut scheduler = Scheduler::new(config.tick, config.job_timeout);
    scheduler.register(Arc::new(CorporateActionDetectionJob::new(
        state.corporate_action_service.clone(),
        config.detection_interval,
    )));
    scheduler.register(Arc::new(PriceRefreshJob::new(
        state.market_data.clone(),
        state.holding_repository.clone(),
        config.price_refresh_at,
    )));
    scheduler.register(Arc::new(SnapshotJob::new(
        state.snapshot_service.clone(),
        config.snapshot_at,
    )));
    scheduler.register(Arc::new(CleanupJob::new(
        state.snapshot_service.clone(),
        state.token_repository.clone(),
        config.snapshot_retention_days,
        config.cleanup_at,
    )));
    scheduler
}
