//! Projection module - the pure replay from ledger to holdings, lots and realized gains.

mod projection_model;
mod projector;
mod symbol_family;

pub use projection_model::Projection;
pub use projector::{default_spinoff_basis_fraction, is_long_term, project, Projector};
pub use symbol_family::{family_transactions, symbol_family};

#[cfg(test)]
mod projector_tests;
