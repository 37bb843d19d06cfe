//! In-memory repositories and fixtures shared by the service tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use folioledger_market_data::{CacheConfig, CachedMarketData, MarketDataAdapter, StaticProvider};

use crate::corporate_actions::{
    CorporateAction, CorporateActionRepositoryTrait, PortfolioAction,
};
use crate::errors::{DatabaseError, Error, Result};
use crate::portfolio::holdings::{Holding, HoldingRepositoryTrait};
use crate::portfolio::snapshot::{PerformanceSnapshot, SnapshotRepositoryTrait};
use crate::portfolio::tax_lots::{RealizedGain, TaxLot};
use crate::portfolios::{
    CostBasisMethod, NewPortfolio, Portfolio, PortfolioAccess, PortfolioLocks,
    PortfolioRepositoryTrait, PortfolioUpdate,
};
use crate::transactions::{
    sort_logical, ImportBatch, LedgerWrite, LedgerWriter, Transaction, TransactionQuery,
    TransactionRepositoryTrait, TransactionType,
};

pub const OWNER: &str = "user-1";
pub const STRANGER: &str = "user-2";

pub fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn ts(date: NaiveDate, seq: u32) -> NaiveDateTime {
    date.and_hms_opt(12, 0, seq).unwrap()
}

/// Ledger entry builder with sensible defaults.
pub struct TxBuilder {
    tx: Transaction,
}

pub fn tx(id: &str, kind: TransactionType, symbol: &str, date: NaiveDate) -> TxBuilder {
    let at = ts(date, 0);
    TxBuilder {
        tx: Transaction {
            id: id.to_string(),
            portfolio_id: "p1".to_string(),
            transaction_type: kind,
            symbol: symbol.to_string(),
            trade_date: date,
            quantity: Decimal::ZERO,
            price: None,
            commission: Decimal::ZERO,
            currency: "USD".to_string(),
            notes: None,
            import_batch_id: None,
            ratio: None,
            related_symbol: None,
            basis_fraction: None,
            lot_selections: vec![],
            corporate_action_id: None,
            created_at: at,
            updated_at: at,
        },
    }
}

impl TxBuilder {
    pub fn portfolio(mut self, portfolio_id: &str) -> Self {
        self.tx.portfolio_id = portfolio_id.to_string();
        self
    }

    pub fn qty(mut self, quantity: Decimal) -> Self {
        self.tx.quantity = quantity;
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.tx.price = Some(price);
        self
    }

    pub fn commission(mut self, commission: Decimal) -> Self {
        self.tx.commission = commission;
        self
    }

    pub fn ratio(mut self, ratio: Decimal) -> Self {
        self.tx.ratio = Some(ratio);
        self
    }

    pub fn related(mut self, symbol: &str) -> Self {
        self.tx.related_symbol = Some(symbol.to_string());
        self
    }

    pub fn seq(mut self, seq: u32) -> Self {
        self.tx.created_at = ts(self.tx.trade_date, seq);
        self.tx.updated_at = self.tx.created_at;
        self
    }

    pub fn build(self) -> Transaction {
        self.tx
    }
}

#[derive(Default)]
struct StoreState {
    portfolios: BTreeMap<String, Portfolio>,
    transactions: Vec<Transaction>,
    batches: Vec<ImportBatch>,
    holdings: Vec<Holding>,
    lots: Vec<TaxLot>,
    gains: Vec<RealizedGain>,
    actions: Vec<CorporateAction>,
    proposals: Vec<PortfolioAction>,
    snapshots: Vec<PerformanceSnapshot>,
    commits: usize,
}

/// One store implementing every repository trait the services need, so a
/// commit can touch ledger, projection and proposal rows together.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    fail_commits: Mutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    /// Makes every subsequent commit fail with a database error.
    pub fn fail_commits(&self, fail: bool) {
        *self.fail_commits.lock().unwrap() = fail;
    }

    pub fn commit_count(&self) -> usize {
        self.state().commits
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        let mut ledger = self.state().transactions.clone();
        sort_logical(&mut ledger);
        ledger
    }

    pub fn seed_snapshot(&self, snapshot: PerformanceSnapshot) {
        self.state().snapshots.push(snapshot);
    }

    pub fn proposals(&self) -> Vec<PortfolioAction> {
        self.state().proposals.clone()
    }
}

#[async_trait]
impl PortfolioRepositoryTrait for InMemoryStore {
    async fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        let now = Utc::now().naive_utc();
        let portfolio = Portfolio {
            id: new_portfolio
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            owner_id: new_portfolio.owner_id,
            name: new_portfolio.name,
            base_currency: new_portfolio.base_currency,
            cost_basis_method: new_portfolio.cost_basis_method,
            created_at: now,
            updated_at: now,
        };
        self.state()
            .portfolios
            .insert(portfolio.id.clone(), portfolio.clone());
        Ok(portfolio)
    }

    async fn update(&self, portfolio_update: PortfolioUpdate) -> Result<Portfolio> {
        let mut state = self.state();
        let portfolio = state
            .portfolios
            .get_mut(&portfolio_update.id)
            .ok_or_else(|| Error::not_found("Portfolio", portfolio_update.id.clone()))?;
        portfolio.name = portfolio_update.name;
        portfolio.cost_basis_method = portfolio_update.cost_basis_method;
        portfolio.updated_at = Utc::now().naive_utc();
        Ok(portfolio.clone())
    }

    async fn delete(&self, portfolio_id: &str) -> Result<usize> {
        let mut state = self.state();
        let removed = state.portfolios.remove(portfolio_id).map_or(0, |_| 1);
        state.transactions.retain(|tx| tx.portfolio_id != portfolio_id);
        state.holdings.retain(|h| h.portfolio_id != portfolio_id);
        state.lots.retain(|l| l.portfolio_id != portfolio_id);
        state.gains.retain(|g| g.portfolio_id != portfolio_id);
        state.proposals.retain(|p| p.portfolio_id != portfolio_id);
        state.snapshots.retain(|s| s.portfolio_id != portfolio_id);
        Ok(removed)
    }

    fn get_by_id(&self, portfolio_id: &str) -> Result<Option<Portfolio>> {
        Ok(self.state().portfolios.get(portfolio_id).cloned())
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>> {
        Ok(self
            .state()
            .portfolios
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Portfolio>> {
        Ok(self.state().portfolios.values().cloned().collect())
    }
}

#[async_trait]
impl TransactionRepositoryTrait for InMemoryStore {
    fn get_by_id(&self, portfolio_id: &str, transaction_id: &str) -> Result<Option<Transaction>> {
        Ok(self
            .state()
            .transactions
            .iter()
            .find(|tx| tx.portfolio_id == portfolio_id && tx.id == transaction_id)
            .cloned())
    }

    fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        let mut matching: Vec<Transaction> = self
            .state()
            .transactions
            .iter()
            .filter(|tx| query.matches(tx))
            .cloned()
            .collect();
        sort_logical(&mut matching);
        Ok(matching)
    }

    fn list_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>> {
        let mut ledger: Vec<Transaction> = self
            .state()
            .transactions
            .iter()
            .filter(|tx| tx.portfolio_id == portfolio_id)
            .cloned()
            .collect();
        sort_logical(&mut ledger);
        Ok(ledger)
    }

    fn get_batch(&self, portfolio_id: &str, batch_id: &str) -> Result<Option<ImportBatch>> {
        Ok(self
            .state()
            .batches
            .iter()
            .find(|b| b.portfolio_id == portfolio_id && b.id == batch_id)
            .cloned())
    }

    fn list_batches(&self, portfolio_id: &str) -> Result<Vec<ImportBatch>> {
        Ok(self
            .state()
            .batches
            .iter()
            .filter(|b| b.portfolio_id == portfolio_id)
            .cloned()
            .collect())
    }

    fn first_trade_date(&self, portfolio_id: &str) -> Result<Option<NaiveDate>> {
        Ok(self
            .state()
            .transactions
            .iter()
            .filter(|tx| tx.portfolio_id == portfolio_id)
            .map(|tx| tx.trade_date)
            .min())
    }

    async fn commit(&self, write: LedgerWrite) -> Result<()> {
        if *self.fail_commits.lock().unwrap() {
            return Err(DatabaseError::TransactionFailed("injected failure".to_string()).into());
        }
        let mut state = self.state();
        let pid = write.portfolio_id.clone();

        if let Some(portfolio) = write.portfolio_update {
            state.portfolios.insert(portfolio.id.clone(), portfolio);
        }
        if let Some(batch) = write.new_batch {
            state.batches.push(batch);
        }
        if let Some(batch_id) = &write.deleted_batch_id {
            state
                .batches
                .retain(|b| !(b.portfolio_id == pid && &b.id == batch_id));
        }
        state
            .transactions
            .retain(|tx| !(tx.portfolio_id == pid && write.deletes.contains(&tx.id)));
        for updated in write.updates {
            if let Some(slot) = state
                .transactions
                .iter_mut()
                .find(|tx| tx.portfolio_id == pid && tx.id == updated.id)
            {
                *slot = updated;
            }
        }
        state.transactions.extend(write.inserts);

        if let Some(replacement) = write.projection {
            let symbols = &replacement.symbols;
            state
                .holdings
                .retain(|h| !(h.portfolio_id == pid && symbols.contains(&h.symbol)));
            state
                .lots
                .retain(|l| !(l.portfolio_id == pid && symbols.contains(&l.symbol)));
            state
                .gains
                .retain(|g| !(g.portfolio_id == pid && symbols.contains(&g.symbol)));
            state.holdings.extend(replacement.projection.holdings);
            state.lots.extend(replacement.projection.lots);
            state.gains.extend(replacement.projection.realized_gains);
        }
        if let Some(proposal) = write.proposal_update {
            if let Some(slot) = state.proposals.iter_mut().find(|p| p.id == proposal.id) {
                *slot = proposal;
            }
        }
        state.commits += 1;
        Ok(())
    }
}

impl HoldingRepositoryTrait for InMemoryStore {
    fn list_holdings(&self, portfolio_id: &str) -> Result<Vec<Holding>> {
        let mut holdings: Vec<Holding> = self
            .state()
            .holdings
            .iter()
            .filter(|h| h.portfolio_id == portfolio_id)
            .cloned()
            .collect();
        holdings.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(holdings)
    }

    fn list_lots(&self, portfolio_id: &str, symbol: Option<&str>) -> Result<Vec<TaxLot>> {
        let mut lots: Vec<TaxLot> = self
            .state()
            .lots
            .iter()
            .filter(|l| l.portfolio_id == portfolio_id)
            .filter(|l| symbol.map_or(true, |s| l.symbol == s))
            .cloned()
            .collect();
        lots.sort_by(|a, b| a.acquisition_date.cmp(&b.acquisition_date));
        Ok(lots)
    }

    fn list_realized_gains(&self, portfolio_id: &str) -> Result<Vec<RealizedGain>> {
        Ok(self
            .state()
            .gains
            .iter()
            .filter(|g| g.portfolio_id == portfolio_id)
            .cloned()
            .collect())
    }

    fn list_lot_holders(&self, symbol: &str) -> Result<Vec<String>> {
        let mut holders: Vec<String> = self
            .state()
            .lots
            .iter()
            .filter(|l| l.symbol == symbol)
            .map(|l| l.portfolio_id.clone())
            .collect();
        holders.sort();
        holders.dedup();
        Ok(holders)
    }

    fn list_held_symbols(&self) -> Result<Vec<String>> {
        let mut symbols: Vec<String> = self
            .state()
            .holdings
            .iter()
            .filter(|h| !h.quantity.is_zero())
            .map(|h| h.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

#[async_trait]
impl CorporateActionRepositoryTrait for InMemoryStore {
    async fn insert_action(&self, action: CorporateAction) -> Result<CorporateAction> {
        let mut state = self.state();
        if state
            .actions
            .iter()
            .any(|a| a.dedupe_key() == action.dedupe_key())
        {
            return Err(DatabaseError::UniqueViolation(action.dedupe_key()).into());
        }
        state.actions.push(action.clone());
        Ok(action)
    }

    fn find_by_dedupe_key(&self, dedupe_key: &str) -> Result<Option<CorporateAction>> {
        Ok(self
            .state()
            .actions
            .iter()
            .find(|a| a.dedupe_key() == dedupe_key)
            .cloned())
    }

    fn get_action(&self, action_id: &str) -> Result<Option<CorporateAction>> {
        Ok(self
            .state()
            .actions
            .iter()
            .find(|a| a.id == action_id)
            .cloned())
    }

    fn list_actions(&self, applied: Option<bool>) -> Result<Vec<CorporateAction>> {
        let mut actions: Vec<CorporateAction> = self
            .state()
            .actions
            .iter()
            .filter(|a| applied.map_or(true, |flag| a.applied == flag))
            .cloned()
            .collect();
        actions.sort_by(|a, b| a.ex_date.cmp(&b.ex_date));
        Ok(actions)
    }

    async fn mark_applied(&self, action_id: &str) -> Result<()> {
        let mut state = self.state();
        let action = state
            .actions
            .iter_mut()
            .find(|a| a.id == action_id)
            .ok_or_else(|| Error::not_found("CorporateAction", action_id))?;
        action.applied = true;
        Ok(())
    }

    async fn insert_proposal(&self, proposal: PortfolioAction) -> Result<PortfolioAction> {
        let mut state = self.state();
        if state.proposals.iter().any(|p| {
            p.portfolio_id == proposal.portfolio_id
                && p.corporate_action_id == proposal.corporate_action_id
                && !p.status.is_terminal()
        }) {
            return Err(DatabaseError::UniqueViolation(format!(
                "open proposal for {} in {}",
                proposal.corporate_action_id, proposal.portfolio_id
            ))
            .into());
        }
        state.proposals.push(proposal.clone());
        Ok(proposal)
    }

    async fn update_proposal(&self, proposal: PortfolioAction) -> Result<PortfolioAction> {
        let mut state = self.state();
        let slot = state
            .proposals
            .iter_mut()
            .find(|p| p.id == proposal.id)
            .ok_or_else(|| Error::not_found("PortfolioAction", proposal.id.clone()))?;
        *slot = proposal.clone();
        Ok(proposal)
    }

    fn get_proposal(&self, proposal_id: &str) -> Result<Option<PortfolioAction>> {
        Ok(self
            .state()
            .proposals
            .iter()
            .find(|p| p.id == proposal_id)
            .cloned())
    }

    fn list_proposals(
        &self,
        portfolio_id: &str,
        pending_only: bool,
    ) -> Result<Vec<PortfolioAction>> {
        Ok(self
            .state()
            .proposals
            .iter()
            .filter(|p| p.portfolio_id == portfolio_id)
            .filter(|p| !pending_only || p.status == crate::corporate_actions::ProposalStatus::Pending)
            .cloned()
            .collect())
    }

    fn list_proposals_for_action(&self, action_id: &str) -> Result<Vec<PortfolioAction>> {
        Ok(self
            .state()
            .proposals
            .iter()
            .filter(|p| p.corporate_action_id == action_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SnapshotRepositoryTrait for InMemoryStore {
    async fn insert(&self, snapshot: PerformanceSnapshot) -> Result<PerformanceSnapshot> {
        let mut state = self.state();
        if state.snapshots.iter().any(|s| {
            s.portfolio_id == snapshot.portfolio_id && s.snapshot_date == snapshot.snapshot_date
        }) {
            return Err(DatabaseError::UniqueViolation(snapshot.id.clone()).into());
        }
        state.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    fn get(&self, portfolio_id: &str, date: NaiveDate) -> Result<Option<PerformanceSnapshot>> {
        Ok(self
            .state()
            .snapshots
            .iter()
            .find(|s| s.portfolio_id == portfolio_id && s.snapshot_date == date)
            .cloned())
    }

    fn list(&self, portfolio_id: &str) -> Result<Vec<PerformanceSnapshot>> {
        let mut snapshots: Vec<PerformanceSnapshot> = self
            .state()
            .snapshots
            .iter()
            .filter(|s| s.portfolio_id == portfolio_id)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.snapshot_date);
        Ok(snapshots)
    }

    fn list_range(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceSnapshot>> {
        Ok(SnapshotRepositoryTrait::list(self, portfolio_id)?
            .into_iter()
            .filter(|s| s.snapshot_date >= start && s.snapshot_date <= end)
            .collect())
    }

    fn latest(&self, portfolio_id: &str) -> Result<Option<PerformanceSnapshot>> {
        Ok(SnapshotRepositoryTrait::list(self, portfolio_id)?.pop())
    }

    async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<usize> {
        let mut state = self.state();
        let before = state.snapshots.len();
        state.snapshots.retain(|s| s.snapshot_date >= cutoff);
        Ok(before - state.snapshots.len())
    }
}

/// Static prices behind the real TTL cache.
pub fn market_data(prices: &[(&str, NaiveDate, Decimal)]) -> Arc<dyn MarketDataAdapter> {
    let provider = StaticProvider::new("USD");
    for (symbol, date, close) in prices {
        provider.set_price(symbol, *date, *close);
    }
    Arc::new(CachedMarketData::new(
        Arc::new(provider),
        CacheConfig::default(),
    ))
}

/// A store with one portfolio owned by [`OWNER`], plus the shared access and writer.
pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub access: PortfolioAccess,
    pub writer: LedgerWriter,
    pub portfolio: Portfolio,
}

impl Fixture {
    pub async fn new(method: CostBasisMethod) -> Self {
        let store = InMemoryStore::new();
        let portfolio = store
            .create(NewPortfolio {
                id: Some("p1".to_string()),
                owner_id: OWNER.to_string(),
                name: "Main".to_string(),
                base_currency: "USD".to_string(),
                cost_basis_method: method,
            })
            .await
            .unwrap();
        let access = PortfolioAccess::new(store.clone(), PortfolioLocks::new());
        let writer = LedgerWriter::new(store.clone());
        Self {
            store,
            access,
            writer,
            portfolio,
        }
    }

    /// Adds another portfolio with the same owner.
    pub async fn add_portfolio(&self, id: &str, method: CostBasisMethod) -> Portfolio {
        self.store
            .create(NewPortfolio {
                id: Some(id.to_string()),
                owner_id: OWNER.to_string(),
                name: format!("Portfolio {}", id),
                base_currency: "USD".to_string(),
                cost_basis_method: method,
            })
            .await
            .unwrap()
    }

    /// Commits `entries` to `portfolio` through the ledger writer.
    pub async fn seed(&self, portfolio: &Portfolio, entries: Vec<Transaction>) {
        let entries: Vec<Transaction> = entries
            .into_iter()
            .map(|mut tx| {
                tx.portfolio_id = portfolio.id.clone();
                tx
            })
            .collect();
        self.writer
            .apply(portfolio, LedgerWrite::new(&portfolio.id).insert_all(entries))
            .await
            .unwrap();
    }

    pub fn holdings_by_symbol(&self, portfolio_id: &str) -> HashMap<String, Holding> {
        self.store
            .list_holdings(portfolio_id)
            .unwrap()
            .into_iter()
            .map(|h| (h.symbol.clone(), h))
            .collect()
    }
}
