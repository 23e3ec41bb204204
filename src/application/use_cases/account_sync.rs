//! Keeps the local entity-to-account mapping in step with the billing
//! provider, in both directions: pushes entity edits out, and reconciles
//! inbound push notifications back into the mapping table.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::app_error::{AppError, AppResult};
use crate::application::ports::account_mapping_repo::AccountMappingRepo;
use crate::application::ports::billing_remote::{NewAccount, RemoteBillingPort};
use crate::application::ports::local_entities::{LocalEntity, LocalEntityRepo};
use crate::domain::entities::account_mapping::AccountMapping;
use crate::domain::entities::push_notification::PushNotification;
use crate::domain::entities::remote_account::RemoteAccount;

/// How a push notification's account was matched to a local entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The account code followed the `{entity_type}-{id}` convention and the
    /// entity exists.
    Linked { entity_type: String, entity_id: i64 },
    /// The code did not match, but a user with the notification's email
    /// address did.
    EmailFallback { entity_id: i64 },
    /// No local owner could be determined; no mapping is recorded.
    Orphaned,
}

pub struct AccountSyncUseCases {
    mappings: Arc<dyn AccountMappingRepo>,
    remote: Arc<dyn RemoteBillingPort>,
    entities: Arc<dyn LocalEntityRepo>,
    /// Entity types with billing enabled. Reconciliation only links
    /// accounts to these types.
    enabled_entity_types: Vec<String>,
}

impl AccountSyncUseCases {
    pub fn new(
        mappings: Arc<dyn AccountMappingRepo>,
        remote: Arc<dyn RemoteBillingPort>,
        entities: Arc<dyn LocalEntityRepo>,
        enabled_entity_types: Vec<String>,
    ) -> Self {
        Self {
            mappings,
            remote,
            entities,
            enabled_entity_types,
        }
    }

    fn type_enabled(&self, entity_type: &str) -> bool {
        self.enabled_entity_types.iter().any(|t| t == entity_type)
    }

    pub async fn mapping_for(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> AppResult<Option<AccountMapping>> {
        self.mappings.find_by_entity(entity_type, entity_id).await
    }

    pub async fn mapping_for_account(
        &self,
        account_code: &str,
    ) -> AppResult<Option<AccountMapping>> {
        self.mappings.find_by_account_code(account_code).await
    }

    /// Loads the remote account behind an entity's mapping. A mapping whose
    /// remote account no longer exists is flagged orphaned rather than
    /// deleted, and reported as absent.
    pub async fn load_remote_account(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> AppResult<Option<RemoteAccount>> {
        let Some(mut mapping) = self.mappings.find_by_entity(entity_type, entity_id).await? else {
            return Ok(None);
        };

        match self.remote.get_account(&mapping.account_code).await {
            Ok(account) => Ok(Some(account)),
            Err(AppError::RemoteNotFound(_)) => {
                warn!(
                    account_code = %mapping.account_code,
                    "remote account is gone, flagging mapping as orphaned"
                );
                mapping.orphaned = true;
                self.mappings.upsert(&mapping).await?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Returns the entity's mapping, creating the remote account and the
    /// mapping on first use. Entry point for the signup workflow.
    pub async fn ensure_account(&self, entity: &LocalEntity) -> AppResult<AccountMapping> {
        if let Some(mapping) = self
            .mappings
            .find_by_entity(&entity.entity_type, entity.entity_id)
            .await?
        {
            return Ok(mapping);
        }

        let account_code = AccountMapping::code_for(&entity.entity_type, entity.entity_id);
        let account = self
            .remote
            .create_account(NewAccount {
                account_code: account_code.clone(),
                username: Some(entity.label.clone()),
                email: entity.email.clone(),
                ..NewAccount::default()
            })
            .await?;
        info!(account_code = %account.account_code, "created remote billing account");

        let mapping = AccountMapping::new(&entity.entity_type, entity.entity_id, &account_code);
        self.mappings.upsert(&mapping).await?;
        Ok(mapping)
    }

    /// Matches a push notification's account to a local entity and records
    /// the result. Never returns the provider's transport errors to the
    /// caller's HTTP response; the listener route treats any `Ok` as handled.
    pub async fn reconcile_notification(
        &self,
        notification: &PushNotification,
    ) -> AppResult<ReconcileOutcome> {
        let Some(account) = notification.account.as_ref() else {
            return Ok(ReconcileOutcome::Orphaned);
        };
        if account.account_code.is_empty() {
            return Ok(ReconcileOutcome::Orphaned);
        }

        // An already-known account only needs its timestamps refreshed.
        if let Some(existing) = self
            .mappings
            .find_by_account_code(&account.account_code)
            .await?
        {
            self.mappings.upsert(&existing).await?;
            return Ok(if existing.orphaned {
                ReconcileOutcome::Orphaned
            } else {
                ReconcileOutcome::Linked {
                    entity_type: existing.entity_type,
                    entity_id: existing.entity_id,
                }
            });
        }

        if let Some((entity_type, entity_id)) = AccountMapping::parse_code(&account.account_code)
            && self.type_enabled(entity_type)
            && self.entities.get(entity_type, entity_id).await?.is_some()
        {
            let mapping = AccountMapping::new(entity_type, entity_id, &account.account_code);
            self.mappings.upsert(&mapping).await?;
            return Ok(ReconcileOutcome::Linked {
                entity_type: entity_type.to_string(),
                entity_id,
            });
        }

        // Accounts created outside this site can still be claimed by email,
        // but only for users; other entity types have no address to match.
        // The notification embeds only partial account data, so prefer the
        // full remote record when it can be fetched.
        if self.type_enabled("user") {
            let email = match self.remote.get_account(&account.account_code).await {
                Ok(remote) => remote.email.or_else(|| account.email.clone()),
                Err(AppError::RemoteNotFound(_)) => account.email.clone(),
                Err(err) => {
                    warn!(
                        account_code = %account.account_code,
                        error = %err,
                        "could not fetch remote account during reconciliation"
                    );
                    account.email.clone()
                }
            };
            if let Some(email) = email.as_deref()
                && let Some(user) = self.entities.find_user_by_email(email).await?
            {
                let mapping = AccountMapping::new("user", user.entity_id, &account.account_code);
                self.mappings.upsert(&mapping).await?;
                info!(
                    account_code = %account.account_code,
                    entity_id = user.entity_id,
                    "matched remote account to a user by email"
                );
                return Ok(ReconcileOutcome::EmailFallback {
                    entity_id: user.entity_id,
                });
            }
        }

        warn!(
            account_code = %account.account_code,
            "no local owner for remote account, leaving it unmapped"
        );
        Ok(ReconcileOutcome::Orphaned)
    }

    /// Pushes a local entity edit out to the provider as a full-resource
    /// account update.
    pub async fn entity_updated(&self, entity: &LocalEntity) -> AppResult<()> {
        let Some(mapping) = self
            .mappings
            .find_by_entity(&entity.entity_type, entity.entity_id)
            .await?
        else {
            return Ok(());
        };
        if mapping.orphaned {
            return Ok(());
        }

        let mut account = self.remote.get_account(&mapping.account_code).await?;
        account.username = Some(entity.label.clone());
        account.email = entity.email.clone();
        self.remote.update_account(&account).await?;
        Ok(())
    }

    /// Closes the remote account and drops the mapping when the entity is
    /// deleted. Closing is best-effort: a provider outage must not block the
    /// local deletion.
    pub async fn entity_deleted(&self, entity_type: &str, entity_id: i64) -> AppResult<()> {
        let Some(mapping) = self.mappings.find_by_entity(entity_type, entity_id).await? else {
            return Ok(());
        };

        match self.remote.close_account(&mapping.account_code).await {
            Ok(()) | Err(AppError::RemoteNotFound(_)) => {}
            Err(err) => {
                warn!(
                    account_code = %mapping.account_code,
                    error = %err,
                    "could not close remote account for deleted entity"
                );
            }
        }
        self.mappings.delete_by_entity(entity_type, entity_id).await
    }
}
