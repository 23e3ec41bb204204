//! Access decisions for billing pages. Three independent gates: the entity
//! type must have billing enabled, the entity must exist, and the actor must
//! be an administrator or the entity itself.

use std::sync::Arc;

use crate::application::app_error::{AppError, AppResult};
use crate::application::jwt::Claims;
use crate::application::ports::local_entities::{LocalEntity, LocalEntityRepo};
use crate::application::use_cases::account_sync::AccountSyncUseCases;
use crate::domain::entities::account_mapping::AccountMapping;

#[derive(Debug, Clone)]
pub struct AccessSettings {
    /// Entity types with billing enabled, e.g. `["user"]`.
    pub enabled_entity_types: Vec<String>,
}

impl AccessSettings {
    pub fn is_enabled(&self, entity_type: &str) -> bool {
        self.enabled_entity_types.iter().any(|t| t == entity_type)
    }
}

pub struct AccessUseCases {
    entities: Arc<dyn LocalEntityRepo>,
    accounts: Arc<AccountSyncUseCases>,
    settings: AccessSettings,
}

impl AccessUseCases {
    pub fn new(
        entities: Arc<dyn LocalEntityRepo>,
        accounts: Arc<AccountSyncUseCases>,
        settings: AccessSettings,
    ) -> Self {
        Self {
            entities,
            accounts,
            settings,
        }
    }

    /// Authorizes the actor for an entity's billing pages and returns the
    /// entity. Disabled entity types and missing entities both read as 404;
    /// neither reveals whether the other gate would have passed.
    pub async fn authorize(
        &self,
        claims: &Claims,
        entity_type: &str,
        entity_id: i64,
    ) -> AppResult<LocalEntity> {
        if !self.settings.is_enabled(entity_type) {
            return Err(AppError::NotFound);
        }

        let is_self = claims.entity_type == entity_type && claims.entity_id()? == entity_id;
        if !claims.admin && !is_self {
            return Err(AppError::Forbidden);
        }

        self.entities
            .get(entity_type, entity_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Like [`authorize`](Self::authorize), but also requires an existing,
    /// non-orphaned account mapping. For every operation except signup.
    pub async fn authorize_with_account(
        &self,
        claims: &Claims,
        entity_type: &str,
        entity_id: i64,
    ) -> AppResult<(LocalEntity, AccountMapping)> {
        let entity = self.authorize(claims, entity_type, entity_id).await?;
        let mapping = self
            .accounts
            .mapping_for(entity_type, entity_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if mapping.orphaned {
            return Err(AppError::NotFound);
        }
        Ok((entity, mapping))
    }
}
