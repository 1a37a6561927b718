//! Durable stores backing the engines.
//!
//! The three tables (challenges, identities, withdraw correlations) are the
//! only shared mutable state in the system. Consuming transitions are single
//! conditional statements so that concurrent callers cannot both win.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use zapgate_core::Result;
use zapgate_core::types::{Challenge, Entitlements, PaidArticle, UserId, WithdrawCorrelation};

/// Outstanding authentication challenges.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert a freshly issued challenge in `pending` state.
    async fn insert_challenge(&self, k1: &str, created_at: DateTime<Utc>) -> Result<()>;

    /// All rows still in `pending` state.
    async fn pending_challenges(&self) -> Result<Vec<Challenge>>;

    /// Consume a pending challenge: transition it to `success` and bind the
    /// resolved user, in one conditional statement. Returns `false` when the
    /// row was already consumed or never existed.
    async fn consume_challenge(&self, k1: &str, user_id: &UserId) -> Result<bool>;

    async fn get_challenge(&self, k1: &str) -> Result<Option<Challenge>>;

    /// Delete challenges created before `cutoff`, whatever their status.
    /// Returns the number of rows removed.
    async fn sweep_challenges(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Drop challenge rows bound to a user (account-deletion cascade).
    async fn delete_challenges_for_user(&self, user_id: &UserId) -> Result<()>;
}

/// User identities and what each has purchased.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<Entitlements>>;

    /// Create an empty entitlement record unless one already exists.
    async fn ensure_user(&self, user_id: &UserId) -> Result<()>;

    /// Set-union `articles` into the user's unlocks under row-level mutual
    /// exclusion, creating the record if absent. Returns the merged set.
    async fn merge_paid_articles(
        &self,
        user_id: &UserId,
        articles: &[PaidArticle],
        payment_hash: Option<&str>,
    ) -> Result<Vec<PaidArticle>>;

    /// Overwrite the premium window. A repeat purchase resets rather than
    /// extends it.
    async fn set_premium(
        &self,
        user_id: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        payment_hash: &str,
    ) -> Result<()>;

    /// Revoke premium by clearing both window bounds.
    async fn clear_premium(&self, user_id: &UserId) -> Result<()>;

    async fn delete_user(&self, user_id: &UserId) -> Result<()>;
}

/// Refund/withdraw correlation records.
#[async_trait]
pub trait WithdrawStore: Send + Sync {
    async fn insert_withdraw(
        &self,
        secret: &str,
        user_id: &UserId,
        created_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn get_withdraw(&self, secret: &str) -> Result<Option<WithdrawCorrelation>>;

    /// Mark a `polling` correlation resolved. Returns `false` when it was
    /// already resolved or never existed, so at most one completion event
    /// drives a revocation.
    async fn complete_withdraw(&self, secret: &str) -> Result<bool>;

    /// Delete `polling` correlations created before `cutoff`.
    async fn sweep_withdraws(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Combined store handle the engines are generic over.
pub trait Store: ChallengeStore + EntitlementStore + WithdrawStore {}

impl<T: ChallengeStore + EntitlementStore + WithdrawStore> Store for T {}
