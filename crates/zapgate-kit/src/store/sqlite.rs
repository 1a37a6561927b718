//! SQLite-backed store.
//!
//! A single-connection pool serializes writes, which SQLite tolerates best
//! under concurrent request load; every consuming transition is still a
//! conditional statement so the store stays correct if the pool ever grows.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use zapgate_core::types::{
    Challenge, ChallengeStatus, Entitlements, PaidArticle, UserId, WithdrawCorrelation,
    WithdrawStatus,
};
use zapgate_core::{Error, Result};

use crate::store::{ChallengeStore, EntitlementStore, WithdrawStore};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS auth_challenges (
    k1         TEXT PRIMARY KEY,
    status     TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    user_id    TEXT
);
CREATE TABLE IF NOT EXISTS users (
    id                TEXT PRIMARY KEY,
    premium_start     TEXT,
    premium_end       TEXT,
    paid_articles     TEXT NOT NULL DEFAULT '[]',
    last_payment_hash TEXT
);
CREATE TABLE IF NOT EXISTS withdraw_secrets (
    secret     TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'polling',
    created_at TEXT NOT NULL
);
"#;

/// SQLite store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) a store at `path` and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::database)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(Error::database)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        Self::connect(opts).await
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:").map_err(Error::database)?;
        Self::connect(opts).await
    }

    async fn connect(opts: SqliteConnectOptions) -> Result<Self> {
        // SQLite permits limited write concurrency; a single connection avoids
        // persistent "database is locked" failures under request concurrency.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(Error::database)?;

        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create the schema if it does not exist yet. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Gracefully close the pool on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_challenge(
    k1: String,
    status: String,
    created_at: DateTime<Utc>,
    user_id: Option<String>,
) -> Result<Challenge> {
    let status = ChallengeStatus::parse(&status)
        .ok_or_else(|| Error::Database(format!("unknown challenge status '{status}'")))?;
    Ok(Challenge {
        k1,
        status,
        created_at,
        user_id: user_id.map(UserId::from),
    })
}

fn decode_articles(json: &str) -> Result<Vec<PaidArticle>> {
    serde_json::from_str(json).map_err(Error::database)
}

fn encode_articles(articles: &[PaidArticle]) -> Result<String> {
    serde_json::to_string(articles).map_err(Error::database)
}

#[async_trait]
impl ChallengeStore for SqliteStore {
    async fn insert_challenge(&self, k1: &str, created_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO auth_challenges (k1, status, created_at) VALUES (?, 'pending', ?)")
            .bind(k1)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(())
    }

    async fn pending_challenges(&self) -> Result<Vec<Challenge>> {
        let rows: Vec<(String, String, DateTime<Utc>, Option<String>)> = sqlx::query_as(
            "SELECT k1, status, created_at, user_id FROM auth_challenges WHERE status = 'pending'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::database)?;

        rows.into_iter()
            .map(|(k1, status, created_at, user_id)| parse_challenge(k1, status, created_at, user_id))
            .collect()
    }

    async fn consume_challenge(&self, k1: &str, user_id: &UserId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE auth_challenges SET status = 'success', user_id = ? \
             WHERE k1 = ? AND status = 'pending'",
        )
        .bind(user_id.as_str())
        .bind(k1)
        .execute(&self.pool)
        .await
        .map_err(Error::database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_challenge(&self, k1: &str) -> Result<Option<Challenge>> {
        let row: Option<(String, String, DateTime<Utc>, Option<String>)> = sqlx::query_as(
            "SELECT k1, status, created_at, user_id FROM auth_challenges WHERE k1 = ?",
        )
        .bind(k1)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::database)?;

        row.map(|(k1, status, created_at, user_id)| parse_challenge(k1, status, created_at, user_id))
            .transpose()
    }

    async fn sweep_challenges(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM auth_challenges WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(result.rows_affected())
    }

    async fn delete_challenges_for_user(&self, user_id: &UserId) -> Result<()> {
        sqlx::query("DELETE FROM auth_challenges WHERE user_id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(())
    }
}

#[async_trait]
impl EntitlementStore for SqliteStore {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<Entitlements>> {
        let row: Option<(
            String,
            Option<DateTime<Utc>>,
            Option<DateTime<Utc>>,
            String,
            Option<String>,
        )> = sqlx::query_as(
            "SELECT id, premium_start, premium_end, paid_articles, last_payment_hash \
             FROM users WHERE id = ?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::database)?;

        row.map(
            |(id, premium_start, premium_end, paid_articles, last_payment_hash)| {
                Ok(Entitlements {
                    id: UserId::from(id),
                    premium_start,
                    premium_end,
                    paid_articles: decode_articles(&paid_articles)?,
                    last_payment_hash,
                })
            },
        )
        .transpose()
    }

    async fn ensure_user(&self, user_id: &UserId) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO users (id, paid_articles) VALUES (?, '[]')")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(())
    }

    async fn merge_paid_articles(
        &self,
        user_id: &UserId,
        articles: &[PaidArticle],
        payment_hash: Option<&str>,
    ) -> Result<Vec<PaidArticle>> {
        // Read-modify-write in one transaction; on the single-connection pool
        // this serializes concurrent merges for the same user.
        let mut tx = self.pool.begin().await.map_err(Error::database)?;

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT paid_articles FROM users WHERE id = ?")
                .bind(user_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::database)?;

        let mut merged = match &existing {
            Some((json,)) => decode_articles(json)?,
            None => Vec::new(),
        };
        for article in articles {
            if !merged.iter().any(|a| a.id == article.id) {
                merged.push(article.clone());
            }
        }
        let json = encode_articles(&merged)?;

        if existing.is_some() {
            sqlx::query(
                "UPDATE users SET paid_articles = ?, \
                 last_payment_hash = COALESCE(?, last_payment_hash) WHERE id = ?",
            )
            .bind(&json)
            .bind(payment_hash)
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(Error::database)?;
        } else {
            sqlx::query("INSERT INTO users (id, paid_articles, last_payment_hash) VALUES (?, ?, ?)")
                .bind(user_id.as_str())
                .bind(&json)
                .bind(payment_hash)
                .execute(&mut *tx)
                .await
                .map_err(Error::database)?;
        }

        tx.commit().await.map_err(Error::database)?;
        Ok(merged)
    }

    async fn set_premium(
        &self,
        user_id: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        payment_hash: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, premium_start, premium_end, last_payment_hash) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 premium_start = excluded.premium_start, \
                 premium_end = excluded.premium_end, \
                 last_payment_hash = excluded.last_payment_hash",
        )
        .bind(user_id.as_str())
        .bind(start)
        .bind(end)
        .bind(payment_hash)
        .execute(&self.pool)
        .await
        .map_err(Error::database)?;
        Ok(())
    }

    async fn clear_premium(&self, user_id: &UserId) -> Result<()> {
        sqlx::query("UPDATE users SET premium_start = NULL, premium_end = NULL WHERE id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::database)?;
        Ok(())
    }
}

#[async_trait]
impl WithdrawStore for SqliteStore {
    async fn insert_withdraw(
        &self,
        secret: &str,
        user_id: &UserId,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO withdraw_secrets (secret, user_id, status, created_at) \
             VALUES (?, ?, 'polling', ?)",
        )
        .bind(secret)
        .bind(user_id.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::database)?;
        Ok(())
    }

    async fn get_withdraw(&self, secret: &str) -> Result<Option<WithdrawCorrelation>> {
        let row: Option<(String, String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT secret, user_id, status, created_at FROM withdraw_secrets WHERE secret = ?",
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::database)?;

        row.map(|(secret, user_id, status, created_at)| {
            let status = WithdrawStatus::parse(&status)
                .ok_or_else(|| Error::Database(format!("unknown withdraw status '{status}'")))?;
            Ok(WithdrawCorrelation {
                secret,
                user_id: UserId::from(user_id),
                status,
                created_at,
            })
        })
        .transpose()
    }

    async fn complete_withdraw(&self, secret: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE withdraw_secrets SET status = 'success' \
             WHERE secret = ? AND status = 'polling'",
        )
        .bind(secret)
        .execute(&self.pool)
        .await
        .map_err(Error::database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn sweep_withdraws(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM withdraw_secrets WHERE status = 'polling' AND created_at < ?",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Error::database)?;
        Ok(result.rows_affected())
    }
}
