use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::HeaderValue;
use chrono::Duration;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

use crate::domain::entities::cancel_behavior::{CancelBehavior, ChangeTiming, SubscriptionDisplay};

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,

    /// Provider subdomain, e.g. `acme` for `acme.recurly.com`. Inbound push
    /// notifications must name it.
    pub recurly_subdomain: String,
    pub recurly_api_key: SecretString,
    /// Random path segment of the push-notification URL. Rotating it
    /// invalidates the URL configured at the provider.
    pub listener_key: String,
    /// Base URL of the provider API. Overridden in tests.
    pub recurly_api_base: String,

    pub default_currency: String,
    pub cancel_behavior: CancelBehavior,
    pub change_timing: ChangeTiming,
    pub subscription_display: SubscriptionDisplay,
    pub per_page: usize,
    pub single_subscription: bool,
    /// Entity types with billing enabled, comma separated in the env.
    pub enabled_entity_types: Vec<String>,
    /// Plan codes offered for signup and plan changes, comma separated.
    /// Empty means all plans.
    pub enabled_plans: Vec<String>,
    pub allow_quantity: bool,
    pub coupon_page_enabled: bool,
    /// Log the raw body of every accepted push notification.
    pub push_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 86_400);
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");

        let recurly_subdomain: String = get_env("RECURLY_SUBDOMAIN");
        let recurly_api_key: SecretString =
            SecretString::new(get_env::<String>("RECURLY_API_KEY").into());
        let listener_key: String = get_env("RECURLY_LISTENER_KEY");
        let recurly_api_base: String = get_env_default(
            "RECURLY_API_BASE",
            format!("https://{recurly_subdomain}.recurly.com/v2"),
        );

        let default_currency: String = get_env_default("DEFAULT_CURRENCY", "USD".to_string());
        let cancel_behavior = CancelBehavior::from_str(&get_env_default(
            "CANCEL_BEHAVIOR",
            "cancel".to_string(),
        ))
        .expect("CANCEL_BEHAVIOR must be cancel, terminate_prorated or terminate_full");
        let subscription_display = SubscriptionDisplay::from_str(&get_env_default(
            "SUBSCRIPTION_DISPLAY",
            "live".to_string(),
        ))
        .expect("SUBSCRIPTION_DISPLAY must be live or all");
        let change_timing = ChangeTiming::from_str(&get_env_default(
            "CHANGE_TIMING",
            "now".to_string(),
        ))
        .expect("CHANGE_TIMING must be now or renewal");
        let per_page: usize = get_env_default("SUBSCRIPTIONS_PER_PAGE", 20);
        let single_subscription: bool = get_env_default("SINGLE_SUBSCRIPTION", true);
        let enabled_entity_types: Vec<String> = csv_list(&get_env_default(
            "BILLING_ENTITY_TYPES",
            "user".to_string(),
        ));
        let enabled_plans: Vec<String> = csv_list(&get_env_default(
            "ENABLED_PLANS",
            String::new(),
        ));
        let allow_quantity: bool = get_env_default("ALLOW_QUANTITY", false);
        let coupon_page_enabled: bool = get_env_default("COUPON_PAGE", true);
        let push_logging: bool = get_env_default("PUSH_LOGGING", false);

        Self {
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            cors_origin,
            bind_addr,
            database_url,
            recurly_subdomain,
            recurly_api_key,
            listener_key,
            recurly_api_base,
            default_currency,
            cancel_behavior,
            change_timing,
            subscription_display,
            per_page,
            single_subscription,
            enabled_entity_types,
            enabled_plans,
            allow_quantity,
            coupon_page_enabled,
            push_logging,
        }
    }
}

fn csv_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
