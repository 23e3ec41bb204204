//! Entity-scoped account, billing-info and invoice routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use super::common::{EntityPath, bearer_claims};
use crate::adapters::http::app_state::AppState;
use crate::application::app_error::{AppError, AppResult};
use crate::application::use_cases::subscription::PastDueCache;
use crate::domain::entities::account_mapping::AccountMapping;
use crate::domain::entities::remote_account::{BillingInfo, RemoteAccount};
use crate::domain::entities::remote_plan::RemoteInvoice;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/billing/account", get(get_account))
        .route("/billing", put(sync_entity).delete(remove_entity))
        .route("/billing_info", get(get_billing_info).put(update_billing_info))
        .route("/invoices", get(list_invoices))
        .route("/invoices/{invoice_number}", get(get_invoice))
        .route("/invoices/{invoice_number}/pdf", get(get_invoice_pdf))
}

#[derive(Serialize)]
struct AccountResponse {
    mapping: AccountMapping,
    /// Absent when the mapping is orphaned.
    account: Option<RemoteAccount>,
}

async fn get_account(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    app_state
        .access
        .authorize(&claims, &path.entity_type, path.entity_id)
        .await?;

    let account = app_state
        .account_sync
        .load_remote_account(&path.entity_type, path.entity_id)
        .await?;
    // Re-read after the load: it may have flagged the mapping orphaned.
    let mapping = app_state
        .account_sync
        .mapping_for(&path.entity_type, path.entity_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(AccountResponse { mapping, account }))
}

/// Pushes the entity's current name and email to the provider. Called by the
/// site when the entity is edited.
async fn sync_entity(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let entity = app_state
        .access
        .authorize(&claims, &path.entity_type, path.entity_id)
        .await?;

    app_state.account_sync.entity_updated(&entity).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Closes the remote account and drops the mapping. Called by the site when
/// the entity is deleted; administrators only.
async fn remove_entity(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    if !claims.admin {
        return Err(AppError::Forbidden);
    }
    app_state
        .account_sync
        .entity_deleted(&path.entity_type, path.entity_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_billing_info(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let info = app_state
        .subscriptions
        .billing_info(&mapping.account_code)
        .await?;
    Ok(Json(info))
}

async fn update_billing_info(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    headers: HeaderMap,
    Json(info): Json<BillingInfo>,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let cache = PastDueCache::default();
    let updated = app_state
        .subscriptions
        .update_billing_info(&mapping.account_code, &info, &cache)
        .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
struct InvoicesQuery {
    #[serde(default)]
    page: usize,
}

async fn list_invoices(
    State(app_state): State<AppState>,
    Path(path): Path<EntityPath>,
    Query(query): Query<InvoicesQuery>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let results = app_state
        .subscriptions
        .invoices(&mapping.account_code, query.page)
        .await?;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
struct InvoicePath {
    entity_type: String,
    entity_id: i64,
    invoice_number: String,
}

#[derive(Serialize)]
struct InvoiceResponse {
    #[serde(flatten)]
    invoice: RemoteInvoice,
    past_due: bool,
}

async fn get_invoice(
    State(app_state): State<AppState>,
    Path(path): Path<InvoicePath>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let invoice = app_state
        .subscriptions
        .invoice(&mapping.account_code, &path.invoice_number)
        .await?;
    let past_due = !invoice.is_paid();
    Ok(Json(InvoiceResponse { invoice, past_due }))
}

async fn get_invoice_pdf(
    State(app_state): State<AppState>,
    Path(path): Path<InvoicePath>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let claims = bearer_claims(&headers, &app_state)?;
    let (_, mapping) = app_state
        .access
        .authorize_with_account(&claims, &path.entity_type, path.entity_id)
        .await?;

    let pdf = app_state
        .subscriptions
        .invoice_pdf(&mapping.account_code, &path.invoice_number)
        .await?;
    let disposition = format!("inline; filename=\"invoice-{}.pdf\"", path.invoice_number);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
