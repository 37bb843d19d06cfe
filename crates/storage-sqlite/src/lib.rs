//! SQLite storage implementation for FolioLedger.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `folioledger-core` and contains:
//! - Database connection pooling and the single-writer actor
//! - Embedded Diesel migrations
//! - Repository implementations for every persisted entity
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! The core is database-agnostic and works with traits.
//!
//! ```text
//!        core (domain)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```
//!
//! Reads go through the pool. Every write is a job on the writer actor, which
//! runs it inside one IMMEDIATE transaction, so a ledger commit and its
//! projection replacement land together or not at all.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod corporate_actions;
pub mod portfolio;
pub mod portfolios;
pub mod transactions;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, open, run_migrations, spawn_writer, DbConfig,
    DbConnection, DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from folioledger-core for convenience
pub use folioledger_core::errors::{DatabaseError, Error, Result};
