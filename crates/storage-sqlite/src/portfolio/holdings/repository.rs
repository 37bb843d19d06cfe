use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;

use folioledger_core::portfolio::holdings::{Holding, HoldingRepositoryTrait};
use folioledger_core::portfolio::tax_lots::{RealizedGain, TaxLot};
use folioledger_core::transactions::ProjectionReplacement;
use folioledger_core::Result;

use super::model::{HoldingDB, RealizedGainDB, TaxLotDB};
use crate::db::get_connection;
use crate::errors::{IntoCore, StorageError};
use crate::schema::{holdings, realized_gains, tax_lots};
use crate::utils::chunk_for_sqlite;

/// Read side of the projection. Writes only happen through
/// [`replace_projection`] inside a ledger commit.
pub struct HoldingRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
}

impl HoldingRepository {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        HoldingRepository { pool }
    }
}

/// Swaps the holdings, lots and realized gains of `replacement.symbols` for the
/// replayed rows. Runs on the writer's connection within the caller's transaction.
pub fn replace_projection(
    conn: &mut SqliteConnection,
    portfolio_id: &str,
    replacement: ProjectionReplacement,
) -> Result<()> {
    let symbols: Vec<String> = replacement.symbols.into_iter().collect();
    for chunk in chunk_for_sqlite(&symbols) {
        diesel::delete(
            holdings::table
                .filter(holdings::portfolio_id.eq(portfolio_id))
                .filter(holdings::symbol.eq_any(chunk)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
        diesel::delete(
            tax_lots::table
                .filter(tax_lots::portfolio_id.eq(portfolio_id))
                .filter(tax_lots::symbol.eq_any(chunk)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
        diesel::delete(
            realized_gains::table
                .filter(realized_gains::portfolio_id.eq(portfolio_id))
                .filter(realized_gains::symbol.eq_any(chunk)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
    }

    let projection = replacement.projection;
    let holding_rows: Vec<HoldingDB> = projection.holdings.into_iter().map(HoldingDB::from).collect();
    let lot_rows: Vec<TaxLotDB> = projection.lots.into_iter().map(TaxLotDB::from).collect();
    let gain_rows: Vec<RealizedGainDB> = projection
        .realized_gains
        .into_iter()
        .enumerate()
        .map(|(position, gain)| RealizedGainDB::from_domain(gain, position as i32))
        .collect();

    for chunk in holding_rows.chunks(100) {
        diesel::insert_into(holdings::table)
            .values(chunk)
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    for chunk in lot_rows.chunks(50) {
        diesel::insert_into(tax_lots::table)
            .values(chunk)
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    for chunk in gain_rows.chunks(30) {
        diesel::insert_into(realized_gains::table)
            .values(chunk)
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    Ok(())
}

impl HoldingRepositoryTrait for HoldingRepository {
    fn list_holdings(&self, portfolio_id: &str) -> Result<Vec<Holding>> {
        let mut conn = get_connection(&self.pool)?;
        holdings::table
            .filter(holdings::portfolio_id.eq(portfolio_id))
            .order(holdings::symbol.asc())
            .select(HoldingDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(|row| Holding::try_from(row).into_core())
            .collect()
    }

    fn list_lots(&self, portfolio_id: &str, symbol: Option<&str>) -> Result<Vec<TaxLot>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = tax_lots::table
            .filter(tax_lots::portfolio_id.eq(portfolio_id))
            .into_boxed();
        if let Some(symbol) = symbol {
            query = query.filter(tax_lots::symbol.eq(symbol));
        }
        query
            .order((tax_lots::acquisition_date.asc(), tax_lots::id.asc()))
            .select(TaxLotDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(|row| TaxLot::try_from(row).into_core())
            .collect()
    }

    fn list_realized_gains(&self, portfolio_id: &str) -> Result<Vec<RealizedGain>> {
        let mut conn = get_connection(&self.pool)?;
        realized_gains::table
            .filter(realized_gains::portfolio_id.eq(portfolio_id))
            .order((
                realized_gains::disposal_date.asc(),
                realized_gains::position.asc(),
                realized_gains::id.asc(),
            ))
            .select(RealizedGainDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(|row| RealizedGain::try_from(row).into_core())
            .collect()
    }

    fn list_lot_holders(&self, symbol: &str) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(tax_lots::table
            .filter(tax_lots::symbol.eq(symbol))
            .select(tax_lots::portfolio_id)
            .distinct()
            .order(tax_lots::portfolio_id.asc())
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?)
    }

    fn list_held_symbols(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        // Zero positions are never materialized, but decimal text may still read "0.00".
        let rows = holdings::table
            .select((holdings::symbol, holdings::quantity))
            .order(holdings::symbol.asc())
            .load::<(String, String)>(&mut conn)
            .map_err(StorageError::from)?;
        let mut symbols = Vec::new();
        for (symbol, quantity) in rows {
            if crate::utils::parse_decimal("quantity", &quantity)?.is_zero() {
                continue;
            }
            if symbols.last() != Some(&symbol) {
                symbols.push(symbol);
            }
        }
        Ok(symbols)
    }
}
