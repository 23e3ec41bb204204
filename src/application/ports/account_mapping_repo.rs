use async_trait::async_trait;

use crate::application::app_error::AppResult;
use crate::domain::entities::account_mapping::AccountMapping;

/// Persistence for the entity-to-remote-account mapping table.
#[async_trait]
pub trait AccountMappingRepo: Send + Sync {
    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> AppResult<Option<AccountMapping>>;

    async fn find_by_account_code(&self, account_code: &str)
        -> AppResult<Option<AccountMapping>>;

    /// Inserts or replaces the mapping for `(entity_type, entity_id)`.
    async fn upsert(&self, mapping: &AccountMapping) -> AppResult<()>;

    async fn delete_by_entity(&self, entity_type: &str, entity_id: i64) -> AppResult<()>;
}
