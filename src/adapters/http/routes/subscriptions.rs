//! Entity-scoped subscription lifecycle routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::common::{EntityPath, bearer_claims};
use crate::adapters::http::app_state::AppState;
use crate::application::app_error::AppResult;
use crate::application::hooks::UrlContext;
use crate::application::use_cases::subscription::PastDueCache;
use crate::domain::entities::cancel_behavior::SubscriptionDisplay;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions))
        .route("/signup", post(signup))
        .route("/coupon", post(redeem_coupon))
        .route("/{uuid}", get(get_subscription))
        .route("/{uuid}/plan/preview", get(preview_plan))
        .route("/{uuid}/plan", post(change_plan))
        .route("/{uuid}/quantity/preview", post(preview_quantity))
        .route("/{uuid}/quantity", post(change_quantity))
        .route("/{uuid}/cancel", post(cancel))
        .route("/{uuid}/reactivate", post(reactivate))
}

#[derive(Debug, Deserialize)]
struct SubscriptionPath {
    entity_type: String,
    entity_id: i64,
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    display: Option<SubscriptionDisplay>,
    #[serde(default)]
    page: usize,
}

/// Sent instead of a listing when the entity has no billing account yet.
#[derive(Serialize)]
struct SignupRedirect {
    signup_url: String,
}

async fn list_subscriptions(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let claims = bearer_claims(&headers, &app_state)?;
    app_state
        .access
        .authorize(&claims, &path.entity_type, path.entity_id)
        .await?;

    let Some(mapping) = app_state
        .account_sync
        .mapping_for(&path.entity_type, path.entity_id)
        .await?
    else {
        // No account yet: point the caller at signup instead of a listing.
        let context = UrlContext {
            entity_type: path.entity_type.clone(),
            entity_id: path.entity_id,
            subscription_uuid: String::new(),
        };
        let signup_url = app_state
            .hooks
            .resolve_url("signup", &context)
            .unwrap_or_default();
        return Ok(Json(SignupRedirect { signup_url }).into_response());
    };

    let cache = PastDueCache::default();
    let results = app_state
        .subscriptions
        .list(
            &path.entity_type,
            path.entity_id,
            &mapping.account_code,
            query.display,
            query.page,
            &cache,
        )
        .await?;
    Ok(Json(results).into_response())
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    plan_code: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default = "default_quantity")]
    quantity: u32,
    #[serde(default)]
    coupon_code: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

async fn signup(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let entity = app_state
        .access
        .authorize(&claims, &path.entity_type, path.entity_id)
        .await?;

    let currency = request
        .currency
        .unwrap_or_else(|| app_state.config.default_currency.clone());
    let subscription = app_state
        .subscriptions
        .signup(
            &entity,
            &request.plan_code,
            &currency,
            request.quantity,
            request.coupon_code.as_deref(),
        )
        .await?;
    Ok(Json(subscription))
}

async fn get_subscription(
    State(app_state): State<AppState>,
    Path(path): Path<SubscriptionPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let cache = PastDueCache::default();
    let summary = app_state
        .subscriptions
        .get(
            &path.entity_type,
            path.entity_id,
            &mapping.account_code,
            &path.uuid,
            &cache,
        )
        .await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct PlanQuery {
    plan_code: String,
}

async fn preview_plan(
    State(app_state): State<AppState>,
    Path(path): Path<SubscriptionPath>,
    Query(query): Query<PlanQuery>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let preview = app_state
        .subscriptions
        .preview_plan(&mapping.account_code, &path.uuid, &query.plan_code)
        .await?;
    Ok(Json(preview))
}

#[derive(Debug, Deserialize)]
struct ChangePlanRequest {
    plan_code: String,
}

async fn change_plan(
    State(app_state): State<AppState>,
    Path(path): Path<SubscriptionPath>,
    headers: HeaderMap,
    Json(request): Json<ChangePlanRequest>,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let updated = app_state
        .subscriptions
        .change_plan(&mapping.account_code, &path.uuid, &request.plan_code)
        .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
struct QuantityPreviewRequest {
    quantity: u32,
}

async fn preview_quantity(
    State(app_state): State<AppState>,
    Path(path): Path<SubscriptionPath>,
    headers: HeaderMap,
    Json(request): Json<QuantityPreviewRequest>,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let preview = app_state
        .subscriptions
        .preview_quantity(&mapping.account_code, &path.uuid, request.quantity)
        .await?;
    Ok(Json(preview))
}

#[derive(Debug, Deserialize)]
struct ChangeQuantityRequest {
    quantity: u32,
    /// The per-period cost the caller saw in the preview. The change only
    /// commits if the preview still produces this number.
    expected_cost_in_cents: i64,
}

async fn change_quantity(
    State(app_state): State<AppState>,
    Path(path): Path<SubscriptionPath>,
    headers: HeaderMap,
    Json(request): Json<ChangeQuantityRequest>,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let cache = PastDueCache::default();
    let updated = app_state
        .subscriptions
        .confirm_quantity(
            &mapping.account_code,
            &path.uuid,
            request.quantity,
            request.expected_cost_in_cents,
            &cache,
        )
        .await?;
    Ok(Json(updated))
}

async fn cancel(
    State(app_state): State<AppState>,
    Path(path): Path<SubscriptionPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let cache = PastDueCache::default();
    let updated = app_state
        .subscriptions
        .cancel(&mapping.account_code, &path.uuid, &cache)
        .await?;
    Ok(Json(updated))
}

async fn reactivate(
    State(app_state): State<AppState>,
    Path(path): Path<SubscriptionPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let updated = app_state
        .subscriptions
        .reactivate(&mapping.account_code, &path.uuid)
        .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
struct RedeemCouponRequest {
    coupon_code: String,
    #[serde(default)]
    plan_code: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

async fn redeem_coupon(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    headers: HeaderMap,
    Json(request): Json<RedeemCouponRequest>,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let currency = request
        .currency
        .unwrap_or_else(|| app_state.config.default_currency.clone());
    let redemption = app_state
        .subscriptions
        .redeem_coupon(
            &mapping.account_code,
            &request.coupon_code,
            &currency,
            request.plan_code.as_deref(),
        )
        .await?;
    Ok(Json(redemption))
}
