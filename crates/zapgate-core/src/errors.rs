use std::fmt::Display;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The challenge could not be durably issued. A `k1` that triggered this
    /// error was never handed to a caller.
    #[error("challenge issuance failed: {0}")]
    ChallengeIssuance(String),

    /// A wallet response did not match any pending challenge. Logged on the
    /// wallet-facing side, never surfaced to a polling client.
    #[error("no pending challenge matches the presented hash")]
    NoMatchingChallenge,

    #[error("invoice creation failed: {0}")]
    InvoiceCreation(String),

    /// The payment processor was unreachable or returned an error. The local
    /// entitlement state is untouched when this is returned.
    #[error("payment status check failed: {0}")]
    PaymentCheck(String),

    /// Refunds are only possible within a fixed window after the premium
    /// purchase; this rejection is not retryable.
    #[error("refund window expired")]
    RefundWindowExpired,

    #[error("missing or invalid session credential")]
    SessionInvalid,

    #[error("store operation failed: {0}")]
    Database(String),
}

impl Error {
    pub fn challenge_issuance(err: impl Display) -> Self {
        Error::ChallengeIssuance(err.to_string())
    }

    pub fn invoice_creation(err: impl Display) -> Self {
        Error::InvoiceCreation(err.to_string())
    }

    pub fn payment_check(err: impl Display) -> Self {
        Error::PaymentCheck(err.to_string())
    }

    pub fn database(err: impl Display) -> Self {
        Error::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
