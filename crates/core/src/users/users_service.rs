use log::debug;
use std::sync::Arc;

use super::users_model::{NewUser, User};
use super::users_traits::{UserRepositoryTrait, UserServiceTrait};
use crate::errors::{Error, Result};

pub struct UserService {
    repository: Arc<dyn UserRepositoryTrait>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepositoryTrait>) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl UserServiceTrait for UserService {
    async fn create_user(&self, mut new_user: NewUser) -> Result<User> {
        new_user.validate()?;
        new_user.email = new_user.email.trim().to_lowercase();
        if self.repository.get_by_email(&new_user.email)?.is_some() {
            return Err(Error::Conflict(format!(
                "a user with email {} already exists",
                new_user.email
            )));
        }
        debug!("Creating user {}", new_user.email);
        self.repository.create(new_user).await
    }

    fn get_user(&self, user_id: &str) -> Result<User> {
        self.repository.get_by_id(user_id)
    }

    async fn record_login(&self, user_id: &str) -> Result<()> {
        self.repository
            .update_last_login(user_id, chrono::Utc::now().naive_utc())
            .await
    }

    async fn change_password_hash(&self, user_id: &str, password_hash: String) -> Result<()> {
        if password_hash.is_empty() {
            return Err(Error::invalid("password hash cannot be empty"));
        }
        self.repository
            .update_password_hash(user_id, password_hash)
            .await
    }
}
