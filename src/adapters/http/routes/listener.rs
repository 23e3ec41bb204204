//! Push-notification listener. The provider POSTs XML to a URL containing a
//! shared random key; the responses here are plain text because the provider
//! only looks at the status code.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{info, warn};

use crate::adapters::http::app_state::AppState;
use crate::domain::entities::push_notification::PushNotification;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{key}", post(handle_without_subdomain))
        .route("/{key}/{subdomain}", post(handle_with_subdomain))
}

async fn handle_without_subdomain(
    State(app_state): State<AppState>,
    Path(key): Path<String>,
    body: String,
) -> Response {
    handle(app_state, key, None, body).await
}

async fn handle_with_subdomain(
    State(app_state): State<AppState>,
    Path((key, subdomain)): Path<(String, String)>,
    body: String,
) -> Response {
    handle(app_state, key, Some(subdomain), body).await
}

async fn handle(
    app_state: AppState,
    key: String,
    subdomain: Option<String>,
    body: String,
) -> Response {
    if let Some(subdomain) = &subdomain
        && *subdomain != app_state.config.recurly_subdomain
    {
        warn!(subdomain, "push notification with wrong subdomain");
        return (
            StatusCode::FORBIDDEN,
            "Incoming push notification did not contain the proper subdomain key.",
        )
            .into_response();
    }

    if key != app_state.config.listener_key {
        warn!("push notification with wrong URL key");
        return (
            StatusCode::FORBIDDEN,
            "Incoming push notification did not contain the proper URL key.",
        )
            .into_response();
    }

    let notification = match PushNotification::from_xml(&body) {
        Ok(notification) => notification,
        Err(err) => {
            warn!(error = %err, "unparseable push notification");
            return (StatusCode::BAD_REQUEST, "Empty or invalid notification.").into_response();
        }
    };

    if app_state.config.push_logging {
        info!(
            notification_type = %notification.notification_type,
            body = %body,
            "received push notification"
        );
    }

    // Sync failures are logged but never surfaced: a non-200 would make the
    // provider retry a notification we cannot act on anyway.
    if notification.affects_account() {
        if let Err(err) = app_state
            .account_sync
            .reconcile_notification(&notification)
            .await
        {
            warn!(
                notification_type = %notification.notification_type,
                error = %err,
                "account sync for push notification failed"
            );
        }
    }

    app_state
        .hooks
        .notify_push(&notification, &app_state.config.recurly_subdomain);

    (StatusCode::OK, "OK").into_response()
}
