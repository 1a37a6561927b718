//! Shared application state: one engine per concern over a common store.

use zapgate_kit::auth::AuthEngine;
use zapgate_kit::config::ZapGateConfig;
use zapgate_kit::payments::PaymentEngine;
use zapgate_kit::processor::{LnbitsClient, PaymentProcessor};
use zapgate_kit::refund::RefundEngine;
use zapgate_kit::session::SessionKeys;
use zapgate_kit::store::{SqliteStore, Store};

#[derive(Clone)]
pub struct PaywallState<S, P> {
    pub auth: AuthEngine<S>,
    pub payments: PaymentEngine<S, P>,
    pub refunds: RefundEngine<S, P>,
    pub sessions: SessionKeys,
    pub store: S,
}

/// The production wiring: SQLite persistence and an LNbits processor.
pub type SqlitePaywallState = PaywallState<SqliteStore, LnbitsClient>;

impl SqlitePaywallState {
    pub fn new(config: ZapGateConfig, store: SqliteStore) -> Self {
        let processor = LnbitsClient::new(config.processor.clone());
        PaywallState::from_parts(config, store, processor)
    }
}

impl<S: Store + Clone, P: PaymentProcessor + Clone> PaywallState<S, P> {
    /// Wire the engines over an arbitrary store and processor.
    pub fn from_parts(config: ZapGateConfig, store: S, processor: P) -> Self {
        PaywallState {
            auth: AuthEngine::new(
                store.clone(),
                config.public_url.clone(),
                config.challenge_ttl,
            ),
            payments: PaymentEngine::new(
                store.clone(),
                processor.clone(),
                config.pricing,
                config.premium_period,
            ),
            refunds: RefundEngine::new(
                store.clone(),
                processor,
                config.pricing.premium_amount,
                config.refund_window,
                config.challenge_ttl,
            ),
            sessions: SessionKeys::new(&config.session),
            store,
        }
    }
}
