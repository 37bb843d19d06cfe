//! SQLite storage implementation for users and session tokens.

mod model;
mod repository;

pub use model::{PasswordResetTokenDB, RefreshTokenDB, UserDB};
pub use repository::{SessionTokenRepository, UserRepository};

// Re-export traits from core for convenience
pub use folioledger_core::users::{SessionTokenRepositoryTrait, UserRepositoryTrait};
