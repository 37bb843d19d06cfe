//! Database models for users and their tokens.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use folioledger_core::users::{PasswordResetToken, RefreshToken, User};

/// Database model for users
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserDB {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub last_login_at: Option<NaiveDateTime>,
}

impl From<UserDB> for User {
    fn from(db: UserDB) -> Self {
        Self {
            id: db.id,
            email: db.email,
            password_hash: db.password_hash,
            created_at: db.created_at,
            last_login_at: db.last_login_at,
        }
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::refresh_tokens)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RefreshTokenDB {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl From<RefreshToken> for RefreshTokenDB {
    fn from(domain: RefreshToken) -> Self {
        Self {
            id: domain.id,
            user_id: domain.user_id,
            token_hash: domain.token_hash,
            expires_at: domain.expires_at,
            created_at: domain.created_at,
        }
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::password_reset_tokens)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PasswordResetTokenDB {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
    pub used_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl From<PasswordResetToken> for PasswordResetTokenDB {
    fn from(domain: PasswordResetToken) -> Self {
        Self {
            id: domain.id,
            user_id: domain.user_id,
            token_hash: domain.token_hash,
            expires_at: domain.expires_at,
            used_at: domain.used_at,
            created_at: domain.created_at,
        }
    }
}
