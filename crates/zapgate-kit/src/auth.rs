//! The LNURL-auth handshake engine.
//!
//! Challenges are issued with a random `k1`, resolved out-of-band by the
//! wallet, and polled by the client. Resolution scans all pending rows and
//! compares the challenge digest of each stored `k1` against the presented
//! hash — this tolerates rotating challenge encodings. Consumption is a
//! single conditional update, so of two concurrent responses presenting the
//! same valid hash at most one wins; the other sees no pending row.

use chrono::{Duration, Utc};
use url::Url;
use zapgate_core::types::{AuthPoll, ChallengeStatus, UserId};
use zapgate_core::{Error, Result};

use crate::store::{ChallengeStore, EntitlementStore};
use crate::{lnurl, qr};

/// A freshly issued challenge, ready to hand to the client.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    /// Bech32-encoded challenge for the wallet.
    pub lnurl: String,
    /// The raw callback URL behind the encoding.
    pub url: Url,
    /// The challenge token; doubles as the client's poll handle.
    pub k1: String,
    /// SVG QR rendering of the encoded challenge.
    pub qr_svg: String,
}

#[derive(Debug, Clone)]
pub struct AuthEngine<S> {
    store: S,
    public_url: Url,
    challenge_ttl: Duration,
}

impl<S: ChallengeStore + EntitlementStore> AuthEngine<S> {
    pub fn new(store: S, public_url: Url, challenge_ttl: Duration) -> Self {
        AuthEngine {
            store,
            public_url,
            challenge_ttl,
        }
    }

    /// Issue a new challenge. The `k1` is only returned once the row is
    /// durably stored.
    pub async fn begin_challenge(&self) -> Result<IssuedChallenge> {
        let k1 = lnurl::generate_k1();
        let url =
            lnurl::auth_challenge_url(&self.public_url, &k1).map_err(Error::challenge_issuance)?;
        let encoded = lnurl::encode_lnurl(&url).map_err(Error::challenge_issuance)?;
        let qr_svg = qr::svg_qr(&encoded).map_err(Error::challenge_issuance)?;

        self.store
            .insert_challenge(&k1, Utc::now())
            .await
            .map_err(Error::challenge_issuance)?;

        tracing::debug!(k1 = %k1, "issued auth challenge");
        Ok(IssuedChallenge {
            lnurl: encoded,
            url,
            k1,
            qr_svg,
        })
    }

    /// Handle a wallet response carrying the signing key and the challenge
    /// digest. On the first match the challenge is consumed and an identity
    /// is provisioned for the key if none exists.
    pub async fn resolve_challenge(&self, presented_key: &str, presented_hash: &str) -> Result<()> {
        let pending = self.store.pending_challenges().await?;
        for challenge in pending {
            let digest = lnurl::challenge_digest(&challenge.k1).map_err(Error::database)?;
            if digest != presented_hash {
                continue;
            }

            let user_id = UserId::from(presented_key);
            if !self.store.consume_challenge(&challenge.k1, &user_id).await? {
                // A concurrent response already consumed this challenge.
                break;
            }
            self.store.ensure_user(&user_id).await?;
            tracing::info!(user = %user_id, "auth challenge resolved");
            return Ok(());
        }
        Err(Error::NoMatchingChallenge)
    }

    /// Poll a challenge by `k1`. Expired rows are swept before the lookup, so
    /// a stale pending challenge uniformly reports `NotFound`.
    pub async fn poll_status(&self, k1: &str) -> Result<AuthPoll> {
        self.store
            .sweep_challenges(Utc::now() - self.challenge_ttl)
            .await?;

        match self.store.get_challenge(k1).await? {
            None => Ok(AuthPoll::NotFound),
            Some(challenge) => match (challenge.status, challenge.user_id) {
                (ChallengeStatus::Success, Some(user_id)) => Ok(AuthPoll::Success { user_id }),
                _ => Ok(AuthPoll::Pending),
            },
        }
    }

    /// Delete the identity and any challenge rows still referencing it.
    pub async fn delete_account(&self, user_id: &UserId) -> Result<()> {
        self.store.delete_user(user_id).await?;
        self.store.delete_challenges_for_user(user_id).await?;
        tracing::info!(user = %user_id, "account deleted");
        Ok(())
    }
}
