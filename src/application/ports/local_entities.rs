use async_trait::async_trait;
use serde::Serialize;

use crate::application::app_error::AppResult;

/// A site entity that can own a billing account. Only the fields the billing
/// integration needs are surfaced.
#[derive(Debug, Clone, Serialize)]
pub struct LocalEntity {
    pub entity_type: String,
    pub entity_id: i64,
    pub label: String,
    pub email: Option<String>,
}

/// Read-only access to the site's own entity storage.
#[async_trait]
pub trait LocalEntityRepo: Send + Sync {
    async fn get(&self, entity_type: &str, entity_id: i64) -> AppResult<Option<LocalEntity>>;

    /// Email lookup used to rescue notifications whose account code does not
    /// follow the `{entity_type}-{id}` convention. Only meaningful for users.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<LocalEntity>>;
}
