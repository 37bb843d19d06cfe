pub mod decimal_utils;
pub mod money;
pub mod time_utils;
