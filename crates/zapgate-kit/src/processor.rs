//! Payment processor interface and the LNbits-compatible HTTP client.
//!
//! The processor is an untrusted, possibly slow external dependency: every
//! call is fallible, carries a timeout, and is never assumed idempotent on
//! the processor's side.

use serde::{Deserialize, Serialize};
use zapgate_core::types::Sats;

use crate::config::ProcessorConfig;

/// A created invoice as returned by the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedInvoice {
    /// The bolt11 payment request the wallet pays.
    pub bolt11: String,
    pub payment_hash: String,
}

/// Settlement status of a single invoice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub paid: bool,
}

/// Parameters for a single-use withdraw (reverse payment) challenge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    /// Minimum claimable amount in millisatoshis.
    pub min_withdrawable: u64,
    /// Maximum claimable amount in millisatoshis; equal to the minimum for
    /// an exact-amount refund.
    pub max_withdrawable: u64,
    pub default_description: String,
    /// How many times the link may be claimed.
    pub uses: u32,
}

impl WithdrawRequest {
    /// An exact-amount, single-use withdraw.
    pub fn exact(amount: Sats, description: impl Into<String>) -> Self {
        WithdrawRequest {
            min_withdrawable: amount.as_msats(),
            max_withdrawable: amount.as_msats(),
            default_description: description.into(),
            uses: 1,
        }
    }
}

/// An issued withdraw challenge: the encoded lnurl the wallet scans and the
/// secret the processor echoes back in its completion event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawChallenge {
    pub lnurl: String,
    pub secret: String,
}

/// External payment processor seam.
pub trait PaymentProcessor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create an incoming invoice for `amount` with the given memo.
    fn create_invoice(
        &self,
        amount: Sats,
        memo: &str,
    ) -> impl Future<Output = Result<CreatedInvoice, Self::Error>> + Send;

    /// Query settlement status for a payment hash.
    fn payment_status(
        &self,
        payment_hash: &str,
    ) -> impl Future<Output = Result<PaymentStatus, Self::Error>> + Send;

    /// Issue a withdraw challenge the wallet can claim funds from.
    fn issue_withdraw(
        &self,
        request: WithdrawRequest,
    ) -> impl Future<Output = Result<WithdrawChallenge, Self::Error>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("processor request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("processor URL invalid: {0}")]
    Url(#[from] url::ParseError),
    #[error("processor response missing {0}")]
    MissingField(&'static str),
}

/// LNbits-compatible HTTP client.
#[derive(Debug, Clone)]
pub struct LnbitsClient {
    config: ProcessorConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CreateInvoiceRequest<'a> {
    amount: u64,
    memo: &'a str,
    out: bool,
}

impl LnbitsClient {
    pub fn new(config: ProcessorConfig) -> Self {
        LnbitsClient {
            config,
            client: reqwest::Client::new(),
        }
    }
}

impl PaymentProcessor for LnbitsClient {
    type Error = ProcessorError;

    async fn create_invoice(&self, amount: Sats, memo: &str) -> Result<CreatedInvoice, ProcessorError> {
        let url = self.config.base_url.join("api/v1/payments")?;
        tracing::debug!(%url, amount = amount.0, memo, api_key = "[redacted]", "creating invoice");

        let invoice: CreatedInvoice = self
            .client
            .post(url)
            .timeout(self.config.timeout)
            .header("X-Api-Key", &self.config.api_key)
            .json(&CreateInvoiceRequest {
                amount: amount.0,
                memo,
                out: false,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if invoice.bolt11.is_empty() {
            return Err(ProcessorError::MissingField("bolt11"));
        }
        tracing::debug!(payment_hash = %invoice.payment_hash, "invoice created");
        Ok(invoice)
    }

    async fn payment_status(&self, payment_hash: &str) -> Result<PaymentStatus, ProcessorError> {
        let url = self
            .config
            .base_url
            .join(&format!("api/v1/payments/{payment_hash}"))?;
        tracing::debug!(%url, api_key = "[redacted]", "checking payment status");

        let status: PaymentStatus = self
            .client
            .get(url)
            .timeout(self.config.timeout)
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(payment_hash, paid = status.paid, "payment status fetched");
        Ok(status)
    }

    async fn issue_withdraw(
        &self,
        request: WithdrawRequest,
    ) -> Result<WithdrawChallenge, ProcessorError> {
        let url = self.config.base_url.join("api/v1/withdraw")?;
        tracing::debug!(%url, msat = request.max_withdrawable, "issuing withdraw challenge");

        let challenge: WithdrawChallenge = self
            .client
            .post(url)
            .timeout(self.config.timeout)
            .header("X-Api-Key", &self.config.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if challenge.secret.is_empty() {
            return Err(ProcessorError::MissingField("secret"));
        }
        Ok(challenge)
    }
}
