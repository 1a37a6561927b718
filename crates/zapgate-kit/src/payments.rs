//! The payment reconciliation engine.
//!
//! Invoices are created through the external processor and confirmed by
//! client polling; nothing is persisted until the processor reports the
//! invoice paid. Both the paid check and the entitlement merge are
//! idempotent, which is the only correctness tool available against
//! duplicate or out-of-order polls.

use chrono::{Duration, Utc};
use zapgate_core::types::{PaidArticle, PurchaseKind, Sats, UserId};
use zapgate_core::{Error, Result};

use crate::config::PricingConfig;
use crate::processor::PaymentProcessor;
use crate::qr;
use crate::store::EntitlementStore;

/// A created invoice, ready to hand to the client.
#[derive(Debug, Clone)]
pub struct Invoice {
    /// The bolt11 payment request.
    pub payment_request: String,
    pub payment_hash: String,
    /// SVG QR rendering of the payment request.
    pub qr_svg: String,
}

#[derive(Debug, Clone)]
pub struct PaymentEngine<S, P> {
    store: S,
    processor: P,
    pricing: PricingConfig,
    premium_period: Duration,
}

impl<S: EntitlementStore, P: PaymentProcessor> PaymentEngine<S, P> {
    pub fn new(store: S, processor: P, pricing: PricingConfig, premium_period: Duration) -> Self {
        PaymentEngine {
            store,
            processor,
            pricing,
            premium_period,
        }
    }

    /// The fixed price for a purchase kind.
    pub fn price(&self, kind: PurchaseKind) -> Sats {
        match kind {
            PurchaseKind::Article => self.pricing.article_amount,
            PurchaseKind::Premium => self.pricing.premium_amount,
        }
    }

    fn memo(kind: PurchaseKind, article_id: Option<&str>) -> Result<String> {
        match kind {
            PurchaseKind::Premium => Ok("Premium access".to_string()),
            PurchaseKind::Article => article_id
                .map(|id| format!("Unlock article {id}"))
                .ok_or_else(|| Error::InvoiceCreation("article purchase without article id".into())),
        }
    }

    /// Create an invoice for a purchase. Invoice state lives only with the
    /// processor and the client until confirmed.
    pub async fn create_invoice(
        &self,
        kind: PurchaseKind,
        article_id: Option<&str>,
    ) -> Result<Invoice> {
        let amount = self.price(kind);
        let memo = Self::memo(kind, article_id)?;

        let invoice = self
            .processor
            .create_invoice(amount, &memo)
            .await
            .map_err(Error::invoice_creation)?;
        let qr_svg = qr::svg_qr(&invoice.bolt11).map_err(Error::invoice_creation)?;

        Ok(Invoice {
            payment_request: invoice.bolt11,
            payment_hash: invoice.payment_hash,
            qr_svg,
        })
    }

    /// Check the processor for settlement and merge the entitlement on
    /// success. Safe to repeat: an unpaid invoice mutates nothing and a paid
    /// one merges idempotently. Processor failures surface as
    /// [`Error::PaymentCheck`] without touching local state.
    pub async fn check_and_reconcile(
        &self,
        payment_hash: &str,
        kind: PurchaseKind,
        user_id: Option<&UserId>,
        article_id: Option<&str>,
    ) -> Result<bool> {
        let status = self
            .processor
            .payment_status(payment_hash)
            .await
            .map_err(Error::payment_check)?;
        if !status.paid {
            return Ok(false);
        }

        match kind {
            PurchaseKind::Article => {
                let article_id = article_id.ok_or_else(|| {
                    Error::PaymentCheck("article check without an article id".into())
                })?;
                let Some(user_id) = user_id else {
                    // Pre-auth purchase: the client holds the unlock and
                    // merges it after login.
                    tracing::debug!(payment_hash, article_id, "paid article confirmed without a session");
                    return Ok(true);
                };
                let article = PaidArticle {
                    id: article_id.to_string(),
                    payment_hash: Some(payment_hash.to_string()),
                    purchased_at: Some(Utc::now()),
                };
                self.store
                    .merge_paid_articles(user_id, &[article], Some(payment_hash))
                    .await?;
                tracing::info!(user = %user_id, article_id, "article unlocked");
            }
            PurchaseKind::Premium => {
                let user_id = user_id.ok_or(Error::SessionInvalid)?;
                let start = Utc::now();
                // A fresh purchase resets the window; it never extends it.
                let end = start + self.premium_period;
                self.store
                    .set_premium(user_id, start, end, payment_hash)
                    .await?;
                tracing::info!(user = %user_id, premium_end = %end, "premium activated");
            }
        }
        Ok(true)
    }

    /// Merge client-held article unlocks (bought before login) into the
    /// user's record. Returns the merged set.
    pub async fn merge_articles(
        &self,
        user_id: &UserId,
        articles: Vec<PaidArticle>,
    ) -> Result<Vec<PaidArticle>> {
        self.store
            .merge_paid_articles(user_id, &articles, None)
            .await
    }
}
