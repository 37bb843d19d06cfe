//! Users module - identities that own portfolios, plus session-token housekeeping.

mod users_model;
mod users_service;
mod users_traits;

pub use users_model::{NewUser, PasswordResetToken, RefreshToken, User};
pub use users_service::UserService;
pub use users_traits::{SessionTokenRepositoryTrait, UserRepositoryTrait, UserServiceTrait};
