//! Test data factories producing valid fixtures.

use axum::http::HeaderValue;
use chrono::Duration;
use secrecy::SecretString;
use std::collections::HashMap;

use crate::{
    application::ports::local_entities::LocalEntity,
    domain::entities::account_mapping::AccountMapping,
    domain::entities::cancel_behavior::{CancelBehavior, ChangeTiming, SubscriptionDisplay},
    domain::entities::remote_plan::{RemoteCoupon, RemoteInvoice, RemotePlan},
    domain::entities::remote_subscription::{BaseState, RemoteSubscription},
    infra::config::AppConfig,
};

pub const TEST_LISTENER_KEY: &str = "s3cr3t-listener-key";
pub const TEST_SUBDOMAIN: &str = "acme";

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: SecretString::from("test-jwt-secret"),
        access_token_ttl: Duration::hours(1),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        recurly_subdomain: TEST_SUBDOMAIN.to_string(),
        recurly_api_key: SecretString::from("test-api-key"),
        listener_key: TEST_LISTENER_KEY.to_string(),
        recurly_api_base: "https://acme.recurly.com/v2".to_string(),
        default_currency: "USD".to_string(),
        cancel_behavior: CancelBehavior::Cancel,
        change_timing: ChangeTiming::Now,
        subscription_display: SubscriptionDisplay::Live,
        per_page: 20,
        single_subscription: true,
        enabled_entity_types: vec!["user".to_string()],
        enabled_plans: vec![],
        allow_quantity: true,
        coupon_page_enabled: true,
        push_logging: false,
    }
}

pub fn test_user(entity_id: i64, email: &str) -> LocalEntity {
    LocalEntity {
        entity_type: "user".to_string(),
        entity_id,
        label: format!("user{entity_id}"),
        email: Some(email.to_string()),
    }
}

pub fn user_mapping(entity_id: i64) -> AccountMapping {
    AccountMapping::new("user", entity_id, &format!("user-{entity_id}"))
}

pub fn active_subscription(account_code: &str, plan_code: &str) -> RemoteSubscription {
    RemoteSubscription {
        uuid: format!("sub-{account_code}-{plan_code}"),
        account_code: account_code.to_string(),
        plan_code: plan_code.to_string(),
        plan_name: None,
        state: BaseState::Active,
        unit_amount_in_cents: 1500,
        quantity: 1,
        currency: "USD".to_string(),
        auto_renew: true,
        trial_started_at: None,
        trial_ends_at: None,
        activated_at: None,
        canceled_at: None,
        expires_at: None,
        current_period_started_at: None,
        current_period_ends_at: None,
        pending_change: None,
        add_ons: vec![],
    }
}

pub fn test_plan(plan_code: &str, usd_cents: i64) -> RemotePlan {
    RemotePlan {
        plan_code: plan_code.to_string(),
        name: format!("{plan_code} plan"),
        description: None,
        unit_amount_in_cents: HashMap::from([("USD".to_string(), usd_cents)]),
        setup_fee_in_cents: HashMap::new(),
        trial_interval_length: 0,
        trial_interval_unit: None,
        plan_interval_length: 1,
        plan_interval_unit: "months".to_string(),
    }
}

pub fn test_coupon(coupon_code: &str) -> RemoteCoupon {
    RemoteCoupon {
        coupon_code: coupon_code.to_string(),
        name: format!("{coupon_code} coupon"),
        state: Some("redeemable".to_string()),
        discount_type: Some("percent".to_string()),
        discount_percent: Some(10),
        discount_in_cents: HashMap::new(),
        applies_to_plans: vec![],
    }
}

pub fn test_invoice(invoice_number: &str, account_code: &str, state: &str) -> RemoteInvoice {
    RemoteInvoice {
        invoice_number: invoice_number.to_string(),
        uuid: format!("inv-{invoice_number}"),
        account_code: account_code.to_string(),
        state: state.to_string(),
        total_in_cents: 1500,
        currency: "USD".to_string(),
        created_at: None,
        closed_at: None,
        line_items: vec![],
    }
}

/// A well-formed push notification body of the given type.
pub fn notification_xml(notification_type: &str, account_code: &str, email: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<{notification_type}>
  <account>
    <account_code>{account_code}</account_code>
    <email>{email}</email>
  </account>
</{notification_type}>"#
    )
}
