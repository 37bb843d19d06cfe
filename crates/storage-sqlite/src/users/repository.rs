use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use folioledger_core::errors::Error;
use folioledger_core::users::{
    NewUser, PasswordResetToken, RefreshToken, SessionTokenRepositoryTrait, User,
    UserRepositoryTrait,
};
use folioledger_core::Result;

use super::model::{PasswordResetTokenDB, RefreshTokenDB, UserDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{password_reset_tokens, refresh_tokens, users};

pub struct UserRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl UserRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        UserRepository { pool, writer }
    }
}

fn require_updated(affected: usize, user_id: String) -> Result<()> {
    if affected == 0 {
        return Err(Error::not_found("User", user_id));
    }
    Ok(())
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<User> {
                let row = UserDB {
                    id: new_user
                        .id
                        .filter(|value| !value.trim().is_empty())
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    email: new_user.email.trim().to_lowercase(),
                    password_hash: new_user.password_hash,
                    created_at: Utc::now().naive_utc(),
                    last_login_at: None,
                };
                let inserted = diesel::insert_into(users::table)
                    .values(&row)
                    .returning(UserDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(User::from(inserted))
            })
            .await
    }

    fn get_by_id(&self, user_id: &str) -> Result<User> {
        let mut conn = get_connection(&self.pool)?;
        users::table
            .find(user_id)
            .select(UserDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(User::from)
            .ok_or_else(|| Error::not_found("User", user_id))
    }

    fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(users::table
            .filter(users::email.eq(email.trim().to_lowercase()))
            .select(UserDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(User::from))
    }

    async fn update_last_login(&self, user_id: &str, at: NaiveDateTime) -> Result<()> {
        let target = user_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(users::table.find(&target))
                    .set(users::last_login_at.eq(Some(at)))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                require_updated(affected, target)
            })
            .await
    }

    async fn update_password_hash(&self, user_id: &str, password_hash: String) -> Result<()> {
        let target = user_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(users::table.find(&target))
                    .set(users::password_hash.eq(password_hash))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                require_updated(affected, target)
            })
            .await
    }
}

/// Token rows only; issuing and verifying tokens is the auth layer's job.
pub struct SessionTokenRepository {
    writer: WriteHandle,
}

impl SessionTokenRepository {
    pub fn new(writer: WriteHandle) -> Self {
        SessionTokenRepository { writer }
    }
}

#[async_trait]
impl SessionTokenRepositoryTrait for SessionTokenRepository {
    async fn insert_refresh_token(&self, token: RefreshToken) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(refresh_tokens::table)
                    .values(RefreshTokenDB::from(token))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn insert_password_reset_token(&self, token: PasswordResetToken) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(password_reset_tokens::table)
                    .values(PasswordResetTokenDB::from(token))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete_expired_refresh_tokens(&self, now: NaiveDateTime) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(
                    diesel::delete(refresh_tokens::table.filter(refresh_tokens::expires_at.le(now)))
                        .execute(conn)
                        .map_err(StorageError::from)?,
                )
            })
            .await
    }

    async fn delete_spent_password_reset_tokens(&self, now: NaiveDateTime) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(
                    password_reset_tokens::table.filter(
                        password_reset_tokens::used_at
                            .is_not_null()
                            .or(password_reset_tokens::expires_at.le(now)),
                    ),
                )
                .execute(conn)
                .map_err(StorageError::from)?)
            })
            .await
    }
}
