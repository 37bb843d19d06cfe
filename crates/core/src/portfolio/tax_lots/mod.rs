//! Tax-lot module - lot allocation, realized gains, harvesting scans and yearly reports.

mod lot_allocator;
mod tax_lots_model;
mod tax_lots_service;
mod tax_lots_traits;

pub use lot_allocator::{allocate, AllocationStrategy, LotConsumption};
pub use tax_lots_model::{
    HarvestOpportunity, LotSelection, RealizedGain, SaleAllocation, SaleRequest, TaxBucket,
    TaxLot, TaxReport,
};
pub use tax_lots_service::TaxLotService;
pub use tax_lots_traits::TaxLotServiceTrait;
