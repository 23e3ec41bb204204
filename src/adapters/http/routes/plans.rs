use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use crate::adapters::http::app_state::AppState;
use crate::application::app_error::AppResult;
use crate::domain::entities::remote_plan::RemotePlan;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_plans))
}

#[derive(Serialize)]
struct PlansResponse {
    plans: Vec<RemotePlan>,
}

/// The plans offered for signup. Public: the signup page shows it before any
/// authentication happens.
async fn list_plans(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut plans = app_state.subscriptions.plans().await?;
    let enabled = &app_state.config.enabled_plans;
    if !enabled.is_empty() {
        plans.retain(|plan| enabled.iter().any(|code| *code == plan.plan_code));
    }
    Ok(Json(PlansResponse { plans }))
}
