use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Lifecycle state of an authentication challenge.
///
/// The only transition is `Pending -> Success`; rows in either state are
/// eventually removed by the expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    Success,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Success => "success",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ChallengeStatus::Pending),
            "success" => Some(ChallengeStatus::Success),
            _ => None,
        }
    }
}

/// One issued LNURL-auth attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// The single-use random token at the center of the handshake.
    pub k1: String,
    pub status: ChallengeStatus,
    pub created_at: DateTime<Utc>,
    /// The wallet key that resolved this challenge; set exactly once,
    /// together with the transition to [`ChallengeStatus::Success`].
    pub user_id: Option<UserId>,
}

/// Result of polling a challenge by its `k1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPoll {
    /// Unknown, already consumed, or expired. The three causes are
    /// indistinguishable on purpose.
    NotFound,
    Pending,
    Success { user_id: UserId },
}
