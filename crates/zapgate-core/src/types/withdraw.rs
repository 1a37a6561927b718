use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawStatus {
    Polling,
    Success,
}

impl WithdrawStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawStatus::Polling => "polling",
            WithdrawStatus::Success => "success",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "polling" => Some(WithdrawStatus::Polling),
            "success" => Some(WithdrawStatus::Success),
            _ => None,
        }
    }
}

/// Bridges an identity-less withdraw completion event back to the user who
/// requested the refund. Never an entitlement source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawCorrelation {
    pub secret: String,
    pub user_id: UserId,
    pub status: WithdrawStatus,
    pub created_at: DateTime<Utc>,
}
