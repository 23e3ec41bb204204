//! Builder for an `AppState` wired to in-memory mocks.

use std::sync::Arc;

use crate::{
    adapters::http::app_state::AppState,
    application::hooks::BillingHooks,
    application::jwt,
    application::ports::account_mapping_repo::AccountMappingRepo,
    application::ports::billing_remote::RemoteBillingPort,
    application::ports::local_entities::{LocalEntity, LocalEntityRepo},
    application::use_cases::access::{AccessSettings, AccessUseCases},
    application::use_cases::account_sync::AccountSyncUseCases,
    application::use_cases::subscription::{SubscriptionSettings, SubscriptionUseCases},
    domain::entities::account_mapping::AccountMapping,
    infra::config::AppConfig,
    test_utils::factories::test_config,
    test_utils::mocks::{InMemoryAccountMappingRepo, InMemoryLocalEntityRepo, MockBillingRemote},
};

/// # Example
///
/// ```ignore
/// let (app_state, remote) = TestAppStateBuilder::new()
///     .with_entity(test_user(1, "verena@example.com"))
///     .with_mapping(user_mapping(1))
///     .build();
/// ```
pub struct TestAppStateBuilder {
    entities: Vec<LocalEntity>,
    mappings: Vec<AccountMapping>,
    config: AppConfig,
    hooks: BillingHooks,
    remote: Arc<MockBillingRemote>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            entities: vec![],
            mappings: vec![],
            config: test_config(),
            hooks: BillingHooks::new(),
            remote: Arc::new(MockBillingRemote::new()),
        }
    }

    pub fn with_entity(mut self, entity: LocalEntity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_mapping(mut self, mapping: AccountMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn with_config(mut self, configure: impl FnOnce(&mut AppConfig)) -> Self {
        configure(&mut self.config);
        self
    }

    pub fn with_hooks(mut self, configure: impl FnOnce(&mut BillingHooks)) -> Self {
        configure(&mut self.hooks);
        self
    }

    /// The mock provider, for seeding fixtures and asserting calls.
    pub fn remote(&self) -> Arc<MockBillingRemote> {
        self.remote.clone()
    }

    pub fn build(self) -> (AppState, Arc<MockBillingRemote>) {
        let mapping_repo =
            Arc::new(InMemoryAccountMappingRepo::with_mappings(self.mappings))
                as Arc<dyn AccountMappingRepo>;
        let entity_repo = Arc::new(InMemoryLocalEntityRepo::with_entities(self.entities))
            as Arc<dyn LocalEntityRepo>;
        let remote = self.remote.clone() as Arc<dyn RemoteBillingPort>;
        let hooks = Arc::new(self.hooks);

        let account_sync = Arc::new(AccountSyncUseCases::new(
            mapping_repo,
            remote.clone(),
            entity_repo.clone(),
            self.config.enabled_entity_types.clone(),
        ));

        let subscriptions = Arc::new(SubscriptionUseCases::new(
            remote,
            account_sync.clone(),
            hooks.clone(),
            SubscriptionSettings {
                cancel_behavior: self.config.cancel_behavior,
                change_timing: self.config.change_timing,
                display: self.config.subscription_display,
                per_page: self.config.per_page,
                single_subscription: self.config.single_subscription,
                enabled_plans: self.config.enabled_plans.clone(),
                allow_quantity: self.config.allow_quantity,
                coupon_page_enabled: self.config.coupon_page_enabled,
            },
        ));

        let access = Arc::new(AccessUseCases::new(
            entity_repo,
            account_sync.clone(),
            AccessSettings {
                enabled_entity_types: self.config.enabled_entity_types.clone(),
            },
        ));

        let app_state = AppState {
            config: Arc::new(self.config),
            account_sync,
            subscriptions,
            access,
            hooks,
        };
        (app_state, self.remote)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bearer token accepted by the test configuration's JWT secret.
pub fn test_bearer(entity_type: &str, entity_id: i64, admin: bool) -> String {
    let config = test_config();
    let token = jwt::issue(
        entity_type,
        entity_id,
        admin,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .expect("test token should issue");
    format!("Bearer {token}")
}
