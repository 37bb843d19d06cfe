//! In-memory caching for market data.

mod ttl_cache;

pub use ttl_cache::{CacheLookup, TtlCache};
