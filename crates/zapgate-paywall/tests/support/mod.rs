//! Test fixtures: a router wired over in-memory SQLite and a scriptable
//! processor.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use url::Url;
use zapgate_core::types::Sats;
use zapgate_kit::config::{ProcessorConfig, SessionConfig, ZapGateConfig};
use zapgate_kit::processor::{
    CreatedInvoice, PaymentProcessor, PaymentStatus, WithdrawChallenge, WithdrawRequest,
};
use zapgate_kit::store::SqliteStore;
use zapgate_paywall::PaywallState;

#[derive(Debug, thiserror::Error)]
#[error("mock processor offline")]
pub struct MockError;

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

    #[allow(dead_code)]
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

fn config() -> ZapGateConfig {
    ZapGateConfig::builder()
        .processor(
            ProcessorConfig::builder()
                .base_url(Url::parse("https://processor.invalid").unwrap())
                .api_key("test-key")
                .build(),
        )
        .public_url(Url::parse("https://pay.example.com").unwrap())
        .session(SessionConfig::builder().secret("test-secret").build())
        .build()
}

pub async fn app() -> (Router, MockProcessor, SqliteStore) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let processor = MockProcessor::new();
    let state = PaywallState::from_parts(config(), store.clone(), processor.clone());
    (zapgate_paywall::router(state), processor, store)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_json_with_cookie(uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `name=value` pair of the session cookie set by a response.
pub fn session_cookie(response: &Response<Body>) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set a cookie")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}
