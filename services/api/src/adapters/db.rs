//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `CredentialStore` and `LinkStore` ports from the
//! `core` crate. It handles all interactions with the PostgreSQL database
//! using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkstash_core::domain::{LinkRecord, User, UserCredentials};
use linkstash_core::ports::{CredentialStore, LinkStore, StorageError};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements both store ports over one pool.
#[derive(Clone)]
pub struct PgAdapter {
    pool: PgPool,
}

impl PgAdapter {
    /// Creates a new `PgAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a sqlx error to the storage taxonomy, turning unique-constraint
/// violations into `Conflict`.
fn write_error(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::WriteFailed(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

impl UserRow {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
        }
    }

    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct LinkRow {
    id: Uuid,
    user_id: Uuid,
    url: String,
    title: String,
    summary: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl LinkRow {
    fn to_domain(self) -> LinkRecord {
        LinkRecord {
            id: self.id,
            user_id: self.user_id,
            url: self.url,
            title: self.title,
            summary: self.summary,
            tags: self.tags,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialStore for PgAdapter {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, email, password_hash",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(row.to_domain())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        Ok(row.map(UserRow::to_credentials))
    }
}

//=========================================================================================
// `LinkStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LinkStore for PgAdapter {
    async fn insert_link(&self, record: &LinkRecord) -> Result<(), StorageError> {
        // The unique index on (user_id, url) is the authoritative duplicate
        // guard; a concurrent duplicate surfaces here as Conflict.
        sqlx::query(
            "INSERT INTO links (id, user_id, url, title, summary, tags, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.url)
        .bind(&record.title)
        .bind(&record.summary)
        .bind(&record.tags)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn links_for_user(&self, user_id: Uuid) -> Result<Vec<LinkRecord>, StorageError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT id, user_id, url, title, summary, tags, created_at \
             FROM links WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        Ok(rows.into_iter().map(LinkRow::to_domain).collect())
    }

    async fn url_exists(&self, user_id: Uuid, url: &str) -> Result<bool, StorageError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM links WHERE user_id = $1 AND url = $2)",
        )
        .bind(user_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        Ok(exists)
    }
}
