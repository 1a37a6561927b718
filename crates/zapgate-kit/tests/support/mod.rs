//! Shared test fixtures: an in-memory store and a scriptable processor.

// Each test binary uses a subset of these helpers.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Duration;
use url::Url;
use zapgate_core::types::Sats;
use zapgate_kit::auth::AuthEngine;
use zapgate_kit::config::PricingConfig;
use zapgate_kit::payments::PaymentEngine;
use zapgate_kit::processor::{
    CreatedInvoice, PaymentProcessor, PaymentStatus, WithdrawChallenge, WithdrawRequest,
};
use zapgate_kit::refund::RefundEngine;
use zapgate_kit::store::SqliteStore;

#[derive(Debug, thiserror::Error)]
#[error("mock processor offline")]
pub struct MockError;

/// In-memory stand-in for the external payment processor.
#[derive(Debug, Clone, Default)]
pub struct MockProcessor {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    paid: HashSet<String>,
    offline: bool,
    counter: u64,
}

impl MockProcessor {
    pub fn new() -> Self {
        MockProcessor::default()
    }

    pub fn mark_paid(&self, payment_hash: &str) {
        self.inner.lock().unwrap().paid.insert(payment_hash.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }
}

impl PaymentProcessor for MockProcessor {
    type Error = MockError;

    async fn create_invoice(&self, _amount: Sats, memo: &str) -> Result<CreatedInvoice, MockError> {
        let mut state = self.inner.lock().unwrap();
        if state.offline {
            return Err(MockError);
        }
        state.counter += 1;
        Ok(CreatedInvoice {
            bolt11: format!("lnbc1mockinvoice{}x{}", state.counter, memo.len()),
            payment_hash: format!("hash-{}", state.counter),
        })
    }

    async fn payment_status(&self, payment_hash: &str) -> Result<PaymentStatus, MockError> {
        let state = self.inner.lock().unwrap();
        if state.offline {
            return Err(MockError);
        }
        Ok(PaymentStatus {
            paid: state.paid.contains(payment_hash),
        })
    }

    async fn issue_withdraw(
        &self,
        _request: WithdrawRequest,
    ) -> Result<WithdrawChallenge, MockError> {
        let mut state = self.inner.lock().unwrap();
        if state.offline {
            return Err(MockError);
        }
        state.counter += 1;
        Ok(WithdrawChallenge {
            lnurl: format!("lnurl1mockwithdraw{}", state.counter),
            secret: format!("secret-{}", state.counter),
        })
    }
}

pub async fn store() -> SqliteStore {
    SqliteStore::open_in_memory().await.unwrap()
}

pub fn public_url() -> Url {
    Url::parse("https://pay.example.com").unwrap()
}

pub fn auth_engine(store: SqliteStore) -> AuthEngine<SqliteStore> {
    AuthEngine::new(store, public_url(), Duration::minutes(5))
}

pub fn payment_engine(
    store: SqliteStore,
    processor: MockProcessor,
) -> PaymentEngine<SqliteStore, MockProcessor> {
    PaymentEngine::new(store, processor, PricingConfig::default(), Duration::days(30))
}

pub fn refund_engine(
    store: SqliteStore,
    processor: MockProcessor,
) -> RefundEngine<SqliteStore, MockProcessor> {
    RefundEngine::new(
        store,
        processor,
        Sats(10),
        Duration::hours(24),
        Duration::minutes(5),
    )
}
