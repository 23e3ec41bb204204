use crate::{
    adapters::http::app_state::AppState,
    application::hooks::BillingHooks,
    application::ports::account_mapping_repo::AccountMappingRepo,
    application::ports::billing_remote::RemoteBillingPort,
    application::ports::local_entities::LocalEntityRepo,
    application::use_cases::access::{AccessSettings, AccessUseCases},
    application::use_cases::account_sync::AccountSyncUseCases,
    application::use_cases::subscription::{SubscriptionSettings, SubscriptionUseCases},
    infra::{config::AppConfig, postgres_persistence, recurly_client::RecurlyClient},
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let mapping_repo_arc = postgres_arc.clone() as Arc<dyn AccountMappingRepo>;
    let entity_repo_arc = postgres_arc.clone() as Arc<dyn LocalEntityRepo>;
    let remote_arc = Arc::new(RecurlyClient::new(
        config.recurly_api_base.clone(),
        config.recurly_api_key.clone(),
    )?) as Arc<dyn RemoteBillingPort>;

    let hooks = Arc::new(BillingHooks::new());

    let account_sync = Arc::new(AccountSyncUseCases::new(
        mapping_repo_arc,
        remote_arc.clone(),
        entity_repo_arc.clone(),
        config.enabled_entity_types.clone(),
    ));

    let subscriptions = Arc::new(SubscriptionUseCases::new(
        remote_arc,
        account_sync.clone(),
        hooks.clone(),
        SubscriptionSettings {
            cancel_behavior: config.cancel_behavior,
            change_timing: config.change_timing,
            display: config.subscription_display,
            per_page: config.per_page,
            single_subscription: config.single_subscription,
            enabled_plans: config.enabled_plans.clone(),
            allow_quantity: config.allow_quantity,
            coupon_page_enabled: config.coupon_page_enabled,
        },
    ));

    let access = Arc::new(AccessUseCases::new(
        entity_repo_arc,
        account_sync.clone(),
        AccessSettings {
            enabled_entity_types: config.enabled_entity_types.clone(),
        },
    ));

    Ok(AppState {
        config: Arc::new(config),
        account_sync,
        subscriptions,
        access,
        hooks,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recurly_bridge=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
