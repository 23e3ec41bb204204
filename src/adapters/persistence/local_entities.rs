use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::adapters::persistence::PostgresPersistence;
use crate::application::app_error::AppResult;
use crate::application::ports::local_entities::{LocalEntity, LocalEntityRepo};

fn row_to_entity(row: PgRow) -> LocalEntity {
    LocalEntity {
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        label: row.get("label"),
        email: row.get("email"),
    }
}

#[async_trait]
impl LocalEntityRepo for PostgresPersistence {
    async fn get(&self, entity_type: &str, entity_id: i64) -> AppResult<Option<LocalEntity>> {
        let row = sqlx::query(
            r#"
            SELECT entity_type, entity_id, label, email
            FROM local_entities
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(row_to_entity))
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<LocalEntity>> {
        let row = sqlx::query(
            r#"
            SELECT entity_type, entity_id, label, email
            FROM local_entities
            WHERE entity_type = 'user' AND lower(email) = lower($1)
            ORDER BY entity_id
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(row_to_entity))
    }
}
