use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// A single unlocked article.
///
/// Serialized into the `paid_articles` JSON column. Older records stored bare
/// article ids; deserialization accepts both shapes, serialization always
/// writes the object form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidArticle {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased_at: Option<DateTime<Utc>>,
}

impl PaidArticle {
    pub fn bare(id: impl Into<String>) -> Self {
        PaidArticle {
            id: id.into(),
            payment_hash: None,
            purchased_at: None,
        }
    }
}

impl<'de> Deserialize<'de> for PaidArticle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Full {
                id: String,
                #[serde(default, rename = "paymentHash")]
                payment_hash: Option<String>,
                #[serde(default, rename = "purchasedAt")]
                purchased_at: Option<DateTime<Utc>>,
            },
            Id(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Full {
                id,
                payment_hash,
                purchased_at,
            } => PaidArticle {
                id,
                payment_hash,
                purchased_at,
            },
            Repr::Id(id) => PaidArticle::bare(id),
        })
    }
}

/// Whether an identity currently holds an active premium window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementStatus {
    Free,
    Premium,
}

/// One authenticated identity and everything it has paid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlements {
    /// Wallet-derived public identifier.
    pub id: UserId,
    pub premium_start: Option<DateTime<Utc>>,
    pub premium_end: Option<DateTime<Utc>>,
    /// Set semantics on the article id; duplicates never appear.
    pub paid_articles: Vec<PaidArticle>,
    pub last_payment_hash: Option<String>,
}

impl Entitlements {
    pub fn empty(id: UserId) -> Self {
        Entitlements {
            id,
            premium_start: None,
            premium_end: None,
            paid_articles: Vec::new(),
            last_payment_hash: None,
        }
    }

    /// A premium window with a null or past end grants nothing.
    pub fn premium_active(&self, now: DateTime<Utc>) -> bool {
        self.premium_end.is_some_and(|end| end > now)
    }

    pub fn status(&self, now: DateTime<Utc>) -> EntitlementStatus {
        if self.premium_active(now) {
            EntitlementStatus::Premium
        } else {
            EntitlementStatus::Free
        }
    }

    pub fn has_article(&self, article_id: &str) -> bool {
        self.paid_articles.iter().any(|a| a.id == article_id)
    }
}
