//! Provider-agnostic port for the hosted billing API.
//!
//! The trait exposes domain-level operations, not provider primitives;
//! implementations map them onto the provider's REST resources. There is one
//! implementation per deployment (`infra::recurly_client::RecurlyClient`)
//! plus a recording mock in `test_utils`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::app_error::AppResult;
use crate::domain::entities::{
    cancel_behavior::{ChangeTiming, RefundType},
    remote_account::{Address, BillingInfo, RemoteAccount},
    remote_plan::{CouponRedemption, RemoteCoupon, RemoteInvoice, RemotePlan, SubscriptionPreview},
    remote_subscription::RemoteSubscription,
};

/// Forward-only iteration over a remote list resource. The provider's list
/// API is cursor-only; there is no random access, so skipping to an offset
/// means walking every record before it.
#[async_trait]
pub trait RemoteCursor<T>: Send {
    /// Total number of records in the remote list.
    fn total(&self) -> usize;

    /// Advances the cursor, fetching the next page from the provider when the
    /// local buffer runs out.
    async fn next(&mut self) -> AppResult<Option<T>>;
}

pub type SubscriptionCursor = Box<dyn RemoteCursor<RemoteSubscription>>;
pub type InvoiceCursor = Box<dyn RemoteCursor<RemoteInvoice>>;

/// Server-side state filter for subscription listings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::AsRefStr,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStateFilter {
    Active,
    PastDue,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewAccount {
    pub account_code: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub account_code: String,
    pub plan_code: String,
    pub currency: String,
    pub quantity: u32,
    pub coupon_code: Option<String>,
}

/// A pending modification to an existing subscription. Used both for the
/// non-committing preview and for the committing update, so the two can
/// never diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionChange {
    pub plan_code: Option<String>,
    pub quantity: Option<u32>,
    pub timing: ChangeTiming,
}

#[async_trait]
pub trait RemoteBillingPort: Send + Sync {
    // Accounts
    async fn get_account(&self, account_code: &str) -> AppResult<RemoteAccount>;
    async fn create_account(&self, account: NewAccount) -> AppResult<RemoteAccount>;
    /// Full-resource update; the provider replaces every field, which
    /// sidesteps nested-object change detection entirely.
    async fn update_account(&self, account: &RemoteAccount) -> AppResult<RemoteAccount>;
    async fn close_account(&self, account_code: &str) -> AppResult<()>;

    // Subscriptions
    async fn get_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription>;
    async fn subscriptions_for_account(
        &self,
        account_code: &str,
        filter: Option<SubscriptionStateFilter>,
        per_page: usize,
    ) -> AppResult<SubscriptionCursor>;
    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> AppResult<RemoteSubscription>;
    async fn preview_change(
        &self,
        uuid: &str,
        change: &SubscriptionChange,
    ) -> AppResult<SubscriptionPreview>;
    async fn apply_change(
        &self,
        uuid: &str,
        change: &SubscriptionChange,
    ) -> AppResult<RemoteSubscription>;
    /// Cancel at renewal: the subscription stays active until the period ends.
    async fn cancel_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription>;
    /// Terminate immediately with the given refund parameter.
    async fn terminate_subscription(
        &self,
        uuid: &str,
        refund: RefundType,
    ) -> AppResult<RemoteSubscription>;
    async fn reactivate_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription>;

    // Plans and coupons
    async fn get_plan(&self, plan_code: &str) -> AppResult<RemotePlan>;
    async fn list_plans(&self) -> AppResult<Vec<RemotePlan>>;
    async fn get_coupon(&self, coupon_code: &str) -> AppResult<RemoteCoupon>;
    async fn redeem_coupon(
        &self,
        coupon_code: &str,
        account_code: &str,
        currency: &str,
    ) -> AppResult<CouponRedemption>;

    // Invoices
    async fn invoices_for_account(
        &self,
        account_code: &str,
        per_page: usize,
    ) -> AppResult<InvoiceCursor>;
    async fn get_invoice(&self, invoice_number: &str) -> AppResult<RemoteInvoice>;
    async fn invoice_pdf(&self, invoice_number: &str) -> AppResult<Vec<u8>>;

    // Billing info
    async fn get_billing_info(&self, account_code: &str) -> AppResult<BillingInfo>;
    async fn update_billing_info(
        &self,
        account_code: &str,
        info: &BillingInfo,
    ) -> AppResult<BillingInfo>;
}
