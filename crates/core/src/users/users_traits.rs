use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::users_model::{NewUser, PasswordResetToken, RefreshToken, User};
use crate::errors::Result;

#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User>;
    fn get_by_id(&self, user_id: &str) -> Result<User>;
    fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update_last_login(&self, user_id: &str, at: NaiveDateTime) -> Result<()>;
    async fn update_password_hash(&self, user_id: &str, password_hash: String) -> Result<()>;
}

/// Refresh and password-reset tokens are issued by the auth layer; the core only purges them.
#[async_trait]
pub trait SessionTokenRepositoryTrait: Send + Sync {
    async fn insert_refresh_token(&self, token: RefreshToken) -> Result<()>;
    async fn insert_password_reset_token(&self, token: PasswordResetToken) -> Result<()>;

    /// Deletes refresh tokens that expired at or before `now`. Returns the number removed.
    async fn delete_expired_refresh_tokens(&self, now: NaiveDateTime) -> Result<usize>;

    /// Deletes password-reset tokens that were used or have expired.
    async fn delete_spent_password_reset_tokens(&self, now: NaiveDateTime) -> Result<usize>;
}

#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User>;
    fn get_user(&self, user_id: &str) -> Result<User>;
    async fn record_login(&self, user_id: &str) -> Result<()>;
    async fn change_password_hash(&self, user_id: &str, password_hash: String) -> Result<()>;
}
