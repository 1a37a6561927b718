//! Route table and handlers.
//!
//! Sessions ride in an `authToken` cookie; handlers that grant or reveal
//! entitlements verify it, handlers that only create invoices or issue
//! challenges do not.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use zapgate_core::Error;
use zapgate_core::types::{AuthPoll, EntitlementStatus, PaidArticle, PurchaseKind, UserId};
use zapgate_kit::processor::PaymentProcessor;
use zapgate_kit::store::Store;

use crate::errors::ApiError;
use crate::state::PaywallState;

const SESSION_COOKIE: &str = "authToken";

pub fn router<S, P>(state: PaywallState<S, P>) -> Router
where
    S: Store + Clone + Send + Sync + 'static,
    P: PaymentProcessor + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/lnurl-auth", get(lnurl_auth))
        .route("/lnurl-auth/callback", get(lnurl_auth_callback))
        .route("/login-status/{k1}", get(login_status))
        .route("/get-price", get(get_price))
        .route("/create-invoice", post(create_invoice))
        .route("/check-payment/{payment_hash}", get(check_payment))
        .route("/paidArticles", post(merge_paid_articles))
        .route("/user-info", get(user_info))
        .route("/auth/status", get(auth_status))
        .route("/logout", post(logout))
        .route("/delete-account", post(delete_account))
        .route("/initiate-premium-refund", post(initiate_premium_refund))
        .route("/check-withdraw-status", get(check_withdraw_status))
        .route("/withdraw-processed", post(withdraw_processed))
        .with_state(state)
}

/// Resolve the session cookie to a user id, or fail as an invalid session.
fn session_user<S, P>(state: &PaywallState<S, P>, jar: &CookieJar) -> Result<UserId, ApiError> {
    let cookie = jar.get(SESSION_COOKIE).ok_or(Error::SessionInvalid)?;
    Ok(state.sessions.verify(cookie.value())?)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LnurlAuthResponse {
    lnurl: String,
    /// Raw callback URL, used by the client for `lightning:` deep links.
    url: String,
    k1: String,
    qr_code: String,
}

async fn lnurl_auth<S, P>(
    State(state): State<PaywallState<S, P>>,
) -> Result<Json<LnurlAuthResponse>, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    let issued = state.auth.begin_challenge().await?;
    Ok(Json(LnurlAuthResponse {
        lnurl: issued.lnurl,
        url: issued.url.to_string(),
        k1: issued.k1,
        qr_code: issued.qr_svg,
    }))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// The challenge digest the wallet signs over.
    k1: String,
    /// The wallet's linking key; becomes the user id.
    key: String,
}

/// Wallet-facing callback. The wallet always gets a uniform acknowledgement;
/// the browser learns the outcome through the poll.
async fn lnurl_auth_callback<S, P>(
    State(state): State<PaywallState<S, P>>,
    Query(query): Query<CallbackQuery>,
) -> Json<serde_json::Value>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    if let Err(err) = state.auth.resolve_challenge(&query.key, &query.k1).await {
        tracing::warn!(error = %err, "auth callback did not resolve");
    }
    Json(json!({ "status": "OK" }))
}

async fn login_status<S, P>(
    State(state): State<PaywallState<S, P>>,
    Path(k1): Path<String>,
    jar: CookieJar,
) -> Result<Response, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    match state.auth.poll_status(&k1).await? {
        AuthPoll::NotFound => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "not_found" })),
        )
            .into_response()),
        AuthPoll::Pending => Ok(Json(json!({ "status": "pending" })).into_response()),
        AuthPoll::Success { user_id } => {
            let token = state.sessions.issue(&user_id)?;
            let jar = jar.add(session_cookie(token));
            Ok((
                jar,
                Json(json!({ "status": "success", "userId": user_id })),
            )
                .into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceQuery {
    #[serde(rename = "type")]
    kind: PurchaseKind,
}

async fn get_price<S, P>(
    State(state): State<PaywallState<S, P>>,
    Query(query): Query<PriceQuery>,
) -> Json<serde_json::Value>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    Json(json!({ "amount": state.payments.price(query.kind).0 }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInvoiceRequest {
    #[serde(rename = "type")]
    kind: PurchaseKind,
    article_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceResponse {
    payment_request: String,
    payment_hash: String,
    qr_code: String,
}

async fn create_invoice<S, P>(
    State(state): State<PaywallState<S, P>>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    let invoice = state
        .payments
        .create_invoice(request.kind, request.article_id.as_deref())
        .await?;
    Ok(Json(InvoiceResponse {
        payment_request: invoice.payment_request,
        payment_hash: invoice.payment_hash,
        qr_code: invoice.qr_svg,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckPaymentQuery {
    #[serde(rename = "type")]
    kind: PurchaseKind,
    article_id: Option<String>,
    /// Pre-auth article purchases may name the user explicitly; a valid
    /// session cookie always takes precedence.
    user_id: Option<String>,
}

async fn check_payment<S, P>(
    State(state): State<PaywallState<S, P>>,
    Path(payment_hash): Path<String>,
    Query(query): Query<CheckPaymentQuery>,
    jar: CookieJar,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    let user_id = match query.kind {
        // Premium binds to an identity, so the session is mandatory.
        PurchaseKind::Premium => Some(session_user(&state, &jar)?),
        PurchaseKind::Article => session_user(&state, &jar)
            .ok()
            .or_else(|| query.user_id.as_deref().map(UserId::from)),
    };

    let paid = state
        .payments
        .check_and_reconcile(
            &payment_hash,
            query.kind,
            user_id.as_ref(),
            query.article_id.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "paid": paid })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeArticlesRequest {
    paid_articles: Vec<PaidArticle>,
}

/// Merge client-held unlocks (articles bought before login) into the account.
async fn merge_paid_articles<S, P>(
    State(state): State<PaywallState<S, P>>,
    jar: CookieJar,
    Json(request): Json<MergeArticlesRequest>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    let user_id = session_user(&state, &jar)?;
    let merged = state
        .payments
        .merge_articles(&user_id, request.paid_articles)
        .await?;
    Ok(Json(json!({ "paidArticles": merged })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserInfoResponse {
    wallet_id: UserId,
    status: EntitlementStatus,
    premium_start: Option<DateTime<Utc>>,
    premium_end: Option<DateTime<Utc>>,
    paid_articles: Vec<PaidArticle>,
}

async fn user_info<S, P>(
    State(state): State<PaywallState<S, P>>,
    jar: CookieJar,
) -> Result<Json<UserInfoResponse>, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    let user_id = session_user(&state, &jar)?;
    // A valid token for a deleted account reads as no session.
    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or(Error::SessionInvalid)?;
    Ok(Json(UserInfoResponse {
        status: user.status(Utc::now()),
        wallet_id: user.id,
        premium_start: user.premium_start,
        premium_end: user.premium_end,
        paid_articles: user.paid_articles,
    }))
}

async fn auth_status<S, P>(
    State(state): State<PaywallState<S, P>>,
    jar: CookieJar,
) -> Json<serde_json::Value>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    match session_user(&state, &jar) {
        Ok(user_id) => Json(json!({ "isAuthenticated": true, "userId": user_id })),
        Err(_) => Json(json!({ "isAuthenticated": false })),
    }
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        jar.remove(expired_session_cookie()),
        Json(json!({ "status": "OK" })),
    )
}

async fn delete_account<S, P>(
    State(state): State<PaywallState<S, P>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    let user_id = session_user(&state, &jar)?;
    state.auth.delete_account(&user_id).await?;
    Ok((
        jar.remove(expired_session_cookie()),
        Json(json!({ "status": "OK" })),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundResponse {
    lnurl: String,
    qr_code: String,
}

async fn initiate_premium_refund<S, P>(
    State(state): State<PaywallState<S, P>>,
    jar: CookieJar,
) -> Result<Json<RefundResponse>, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    let user_id = session_user(&state, &jar)?;
    let issued = state.refunds.initiate_refund(&user_id).await?;
    Ok(Json(RefundResponse {
        lnurl: issued.lnurl,
        qr_code: issued.qr_svg,
    }))
}

async fn check_withdraw_status<S, P>(
    State(state): State<PaywallState<S, P>>,
    jar: CookieJar,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    let user_id = session_user(&state, &jar)?;
    let withdrawn = state.refunds.check_withdraw_status(&user_id).await?;
    Ok(Json(json!({ "withdrawn": withdrawn })))
}

#[derive(Debug, Deserialize)]
struct WithdrawProcessedRequest {
    secret: String,
}

/// Processor-facing completion event. Idempotent by construction, so the
/// processor may retry freely.
async fn withdraw_processed<S, P>(
    State(state): State<PaywallState<S, P>>,
    Json(request): Json<WithdrawProcessedRequest>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: Store + Clone,
    P: PaymentProcessor,
{
    state.refunds.on_withdraw_completed(&request.secret).await?;
    Ok(Json(json!({ "status": "OK" })))
}
