//! Refund withdraws: eligibility window, single-shot revocation, sweeping.

mod support;

use chrono::{Duration, Utc};
use zapgate_core::Error;
use zapgate_core::types::UserId;
use zapgate_kit::store::{EntitlementStore, WithdrawStore};

fn user() -> UserId {
    UserId::from("02cafebabe")
}

async fn seed_premium(store: &zapgate_kit::store::SqliteStore, user_id: &UserId, age: Duration) {
    let start = Utc::now() - age;
    store
        .set_premium(user_id, start, start + Duration::days(30), "seed-hash")
        .await
        .unwrap();
}

#[tokio::test]
async fn refund_within_window_issues_a_withdraw() {
    let store = support::store().await;
    let processor = support::MockProcessor::new();
    let refunds = support::refund_engine(store.clone(), processor);
    let user_id = user();
    seed_premium(&store, &user_id, Duration::hours(1)).await;

    let issued = refunds.initiate_refund(&user_id).await.unwrap();
    assert!(issued.lnurl.starts_with("lnurl1"));
    assert!(issued.qr_svg.contains("<svg"));

    // The correlation row is waiting for the completion event.
    let correlation = store.get_withdraw("secret-1").await.unwrap().unwrap();
    assert_eq!(correlation.user_id, user_id);
}

#[tokio::test]
async fn refund_outside_window_is_rejected() {
    let store = support::store().await;
    let refunds = support::refund_engine(store.clone(), support::MockProcessor::new());
    let user_id = user();
    seed_premium(&store, &user_id, Duration::hours(25)).await;

    let result = refunds.initiate_refund(&user_id).await;
    assert!(matches!(result, Err(Error::RefundWindowExpired)));
}

#[tokio::test]
async fn refund_exactly_at_the_boundary_is_rejected() {
    let store = support::store().await;
    let refunds = support::refund_engine(store.clone(), support::MockProcessor::new());
    let user_id = user();
    // A hair past 24h so clock skew during the test cannot flip the result.
    seed_premium(&store, &user_id, Duration::hours(24) + Duration::seconds(1)).await;

    let result = refunds.initiate_refund(&user_id).await;
    assert!(matches!(result, Err(Error::RefundWindowExpired)));
}

#[tokio::test]
async fn refund_without_premium_is_rejected() {
    let store = support::store().await;
    let refunds = support::refund_engine(store.clone(), support::MockProcessor::new());
    let user_id = user();
    store.ensure_user(&user_id).await.unwrap();

    let result = refunds.initiate_refund(&user_id).await;
    assert!(matches!(result, Err(Error::RefundWindowExpired)));
}

#[tokio::test]
async fn completion_revokes_premium_exactly_once() {
    let store = support::store().await;
    let refunds = support::refund_engine(store.clone(), support::MockProcessor::new());
    let user_id = user();
    seed_premium(&store, &user_id, Duration::hours(1)).await;

    refunds.initiate_refund(&user_id).await.unwrap();
    assert!(!refunds.check_withdraw_status(&user_id).await.unwrap());

    refunds.on_withdraw_completed("secret-1").await.unwrap();
    let record = store.get_user(&user_id).await.unwrap().unwrap();
    assert!(record.premium_start.is_none());
    assert!(record.premium_end.is_none());
    assert!(refunds.check_withdraw_status(&user_id).await.unwrap());

    // A repeated completion event is a no-op, even after the user buys
    // premium again.
    seed_premium(&store, &user_id, Duration::hours(0)).await;
    refunds.on_withdraw_completed("secret-1").await.unwrap();
    let record = store.get_user(&user_id).await.unwrap().unwrap();
    assert!(record.premium_end.is_some());
}

#[tokio::test]
async fn completion_for_unknown_secret_is_ignored() {
    let store = support::store().await;
    let refunds = support::refund_engine(store.clone(), support::MockProcessor::new());
    let user_id = user();
    seed_premium(&store, &user_id, Duration::hours(1)).await;

    refunds.on_withdraw_completed("no-such-secret").await.unwrap();
    let record = store.get_user(&user_id).await.unwrap().unwrap();
    assert!(record.premium_end.is_some());
}

#[tokio::test]
async fn stale_polling_correlations_are_swept_on_completion() {
    let store = support::store().await;
    let refunds = support::refund_engine(store.clone(), support::MockProcessor::new());
    let user_id = user();
    seed_premium(&store, &user_id, Duration::hours(1)).await;

    // An abandoned withdraw from ten minutes ago.
    store
        .insert_withdraw("stale-secret", &user_id, Utc::now() - Duration::minutes(10))
        .await
        .unwrap();

    refunds.initiate_refund(&user_id).await.unwrap();
    refunds.on_withdraw_completed("secret-1").await.unwrap();

    assert!(store.get_withdraw("stale-secret").await.unwrap().is_none());
}

#[tokio::test]
async fn resolved_correlations_survive_the_sweep() {
    let store = support::store().await;
    let user_id = user();
    store.ensure_user(&user_id).await.unwrap();

    store
        .insert_withdraw("done-secret", &user_id, Utc::now() - Duration::minutes(10))
        .await
        .unwrap();
    assert!(store.complete_withdraw("done-secret").await.unwrap());

    let swept = store
        .sweep_withdraws(Utc::now() - Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(swept, 0);
    assert!(store.get_withdraw("done-secret").await.unwrap().is_some());
}

#[tokio::test]
async fn processor_failure_surfaces_without_a_correlation_row() {
    let store = support::store().await;
    let processor = support::MockProcessor::new();
    let refunds = support::refund_engine(store.clone(), processor.clone());
    let user_id = user();
    seed_premium(&store, &user_id, Duration::hours(1)).await;
    processor.set_offline(true);

    let result = refunds.initiate_refund(&user_id).await;
    assert!(matches!(result, Err(Error::InvoiceCreation(_))));
    assert!(store.get_withdraw("secret-1").await.unwrap().is_none());
}
