use std::sync::Arc;

use crate::{
    application::hooks::BillingHooks,
    application::use_cases::access::AccessUseCases,
    application::use_cases::account_sync::AccountSyncUseCases,
    application::use_cases::subscription::SubscriptionUseCases,
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub account_sync: Arc<AccountSyncUseCases>,
    pub subscriptions: Arc<SubscriptionUseCases>,
    pub access: Arc<AccessUseCases>,
    pub hooks: Arc<BillingHooks>,
}
