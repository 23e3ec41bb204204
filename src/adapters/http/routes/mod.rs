pub mod account;
pub mod common;
pub mod listener;
pub mod plans;
pub mod subscriptions;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/listener", listener::router())
        .nest("/plans", plans::router())
        .nest(
            "/entities/{entity_type}/{entity_id}",
            Router::new()
                .merge(account::router())
                .nest("/subscription", subscriptions::router()),
        )
}
