//! The refund/withdraw engine.
//!
//! A refund is a single-use LNURL-withdraw challenge for exactly the premium
//! amount. The correlation table only bridges the processor's identity-less
//! completion event back to a user; the entitlement record stays the single
//! source of truth the client polls.

use chrono::{Duration, Utc};
use zapgate_core::types::{Sats, UserId};
use zapgate_core::{Error, Result};

use crate::processor::{PaymentProcessor, WithdrawRequest};
use crate::qr;
use crate::store::{EntitlementStore, WithdrawStore};

/// An issued withdraw challenge, ready to hand to the client.
#[derive(Debug, Clone)]
pub struct IssuedWithdraw {
    /// Bech32-encoded withdraw challenge for the wallet.
    pub lnurl: String,
    /// SVG QR rendering of the encoded challenge.
    pub qr_svg: String,
}

#[derive(Debug, Clone)]
pub struct RefundEngine<S, P> {
    store: S,
    processor: P,
    premium_amount: Sats,
    refund_window: Duration,
    withdraw_ttl: Duration,
}

impl<S: EntitlementStore + WithdrawStore, P: PaymentProcessor> RefundEngine<S, P> {
    pub fn new(
        store: S,
        processor: P,
        premium_amount: Sats,
        refund_window: Duration,
        withdraw_ttl: Duration,
    ) -> Self {
        RefundEngine {
            store,
            processor,
            premium_amount,
            refund_window,
            withdraw_ttl,
        }
    }

    /// Issue a refund withdraw for a premium purchase made less than the
    /// refund window ago. Exactly at the boundary the refund is rejected.
    pub async fn initiate_refund(&self, user_id: &UserId) -> Result<IssuedWithdraw> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(Error::RefundWindowExpired)?;

        let now = Utc::now();
        let eligible = user
            .premium_start
            .is_some_and(|start| now - start < self.refund_window);
        if !eligible {
            return Err(Error::RefundWindowExpired);
        }

        let challenge = self
            .processor
            .issue_withdraw(WithdrawRequest::exact(self.premium_amount, "Premium refund"))
            .await
            .map_err(Error::invoice_creation)?;

        self.store
            .insert_withdraw(&challenge.secret, user_id, now)
            .await?;
        let qr_svg = qr::svg_qr(&challenge.lnurl).map_err(Error::invoice_creation)?;

        tracing::info!(user = %user_id, "refund withdraw issued");
        Ok(IssuedWithdraw {
            lnurl: challenge.lnurl,
            qr_svg,
        })
    }

    /// Handle the processor's "withdraw processed" event. Unknown or already
    /// resolved secrets are logged and ignored; a known polling secret
    /// revokes the premium window exactly once.
    pub async fn on_withdraw_completed(&self, secret: &str) -> Result<()> {
        let Some(correlation) = self.store.get_withdraw(secret).await? else {
            tracing::warn!("withdraw completion for unknown secret; ignoring");
            return Ok(());
        };

        if !self.store.complete_withdraw(secret).await? {
            tracing::debug!("withdraw already resolved; ignoring repeat completion");
            return Ok(());
        }

        self.store.clear_premium(&correlation.user_id).await?;
        tracing::info!(user = %correlation.user_id, "premium revoked after withdraw");

        // Opportunistic sweep of correlations nobody will ever complete.
        self.store
            .sweep_withdraws(Utc::now() - self.withdraw_ttl)
            .await?;
        Ok(())
    }

    /// Whether the user's refund has gone through, derived solely from the
    /// entitlement record.
    pub async fn check_withdraw_status(&self, user_id: &UserId) -> Result<bool> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::Database("user not found".into()))?;
        Ok(user.premium_end.is_none())
    }
}
