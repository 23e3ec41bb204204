use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::adapters::persistence::PostgresPersistence;
use crate::application::app_error::AppResult;
use crate::application::ports::account_mapping_repo::AccountMappingRepo;
use crate::domain::entities::account_mapping::AccountMapping;

fn row_to_mapping(row: PgRow) -> AccountMapping {
    AccountMapping {
        entity_type: row.get("entity_type"),
        entity_id: row.get("entity_id"),
        account_code: row.get("account_code"),
        orphaned: row.get("orphaned"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl AccountMappingRepo for PostgresPersistence {
    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> AppResult<Option<AccountMapping>> {
        let row = sqlx::query(
            r#"
            SELECT entity_type, entity_id, account_code, orphaned, created_at, updated_at
            FROM billing_account_mappings
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(row_to_mapping))
    }

    async fn find_by_account_code(
        &self,
        account_code: &str,
    ) -> AppResult<Option<AccountMapping>> {
        let row = sqlx::query(
            r#"
            SELECT entity_type, entity_id, account_code, orphaned, created_at, updated_at
            FROM billing_account_mappings
            WHERE account_code = $1
            "#,
        )
        .bind(account_code)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(row_to_mapping))
    }

    async fn upsert(&self, mapping: &AccountMapping) -> AppResult<()> {
        // account_code is the primary key; a notification may re-link an
        // account to a different entity, so the entity columns are updated too.
        sqlx::query(
            r#"
            INSERT INTO billing_account_mappings
                (account_code, entity_type, entity_id, orphaned, created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now())
            ON CONFLICT (account_code) DO UPDATE SET
                entity_type = EXCLUDED.entity_type,
                entity_id = EXCLUDED.entity_id,
                orphaned = EXCLUDED.orphaned,
                updated_at = now()
            "#,
        )
        .bind(&mapping.account_code)
        .bind(&mapping.entity_type)
        .bind(mapping.entity_id)
        .bind(mapping.orphaned)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn delete_by_entity(&self, entity_type: &str, entity_id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM billing_account_mappings
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
