use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePlan {
    pub plan_code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Price per currency code, in cents.
    #[serde(default)]
    pub unit_amount_in_cents: HashMap<String, i64>,
    #[serde(default)]
    pub setup_fee_in_cents: HashMap<String, i64>,
    #[serde(default)]
    pub trial_interval_length: u32,
    #[serde(default)]
    pub trial_interval_unit: Option<String>,
    pub plan_interval_length: u32,
    pub plan_interval_unit: String,
}

impl RemotePlan {
    pub fn price_for(&self, currency: &str) -> Option<i64> {
        self.unit_amount_in_cents.get(currency).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCoupon {
    pub coupon_code: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub discount_type: Option<String>,
    #[serde(default)]
    pub discount_percent: Option<u32>,
    #[serde(default)]
    pub discount_in_cents: HashMap<String, i64>,
    /// Plan codes the coupon is restricted to; empty means all plans.
    #[serde(default)]
    pub applies_to_plans: Vec<String>,
}

impl RemoteCoupon {
    pub fn is_redeemable(&self) -> bool {
        self.state.as_deref().is_none_or(|s| s == "redeemable")
    }

    pub fn applies_to(&self, plan_code: &str) -> bool {
        self.applies_to_plans.is_empty() || self.applies_to_plans.iter().any(|p| p == plan_code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponRedemption {
    pub coupon_code: String,
    pub account_code: String,
    pub currency: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub amount_in_cents: i64,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteInvoice {
    pub invoice_number: String,
    pub uuid: String,
    pub account_code: String,
    /// `paid`, `pending`, `past_due`, `failed`, ...
    pub state: String,
    pub total_in_cents: i64,
    pub currency: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub line_items: Vec<InvoiceLineItem>,
}

impl RemoteInvoice {
    pub fn is_paid(&self) -> bool {
        self.state == "paid"
    }
}

/// Result of a non-committing preview call: the charges and credits the
/// provider would issue if the pending change were applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPreview {
    /// Total the subscription would bill per period after the change.
    pub cost_in_cents: i64,
    pub currency: String,
    #[serde(default)]
    pub charge_invoice: Option<RemoteInvoice>,
    #[serde(default)]
    pub credit_invoices: Vec<RemoteInvoice>,
}
