/// Decimal scale for intermediate accounting results (banker's rounding).
pub const INTERMEDIATE_DECIMAL_PRECISION: u32 = 10;

/// Decimal scale for monetary presentation
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Quantity threshold for significant positions
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Holding period (in days) at or beyond which a realized gain is long-term.
pub const LONG_TERM_HOLDING_DAYS: i64 = 365;

/// Days per year used by annualization
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Day count used as the IRR discounting exponent base
pub const IRR_DAY_COUNT: f64 = 365.0;

/// IRR bisection bracket and stopping rules
pub const IRR_LOWER_BOUND: f64 = -0.9999;
pub const IRR_UPPER_BOUND: f64 = 10.0;
pub const IRR_TOLERANCE: f64 = 1e-7;
pub const IRR_MAX_ITERATIONS: u32 = 200;

/// How far back a missing price may fall back to the last known close.
pub const PRICE_FALLBACK_DAYS: i64 = 7;

/// Default share of basis moved to spun-off shares when the action doesn't say.
pub const DEFAULT_SPINOFF_BASIS_FRACTION: &str = "0.5";

/// Default retention for performance snapshots
pub const DEFAULT_SNAPSHOT_RETENTION_DAYS: i64 = 365;

/// Maximum portfolio name length
pub const PORTFOLIO_NAME_MAX_LEN: usize = 255;
