//! Subscription lifecycle workflows: signup, plan changes, quantity changes,
//! cancellation and reactivation, coupons, invoices and billing info.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::application::app_error::{AppError, AppResult};
use crate::application::hooks::{BillingHooks, OperationLink, UrlContext};
use crate::application::ports::billing_remote::{
    NewSubscription, RemoteBillingPort, SubscriptionChange, SubscriptionStateFilter,
};
use crate::application::ports::local_entities::LocalEntity;
use crate::application::use_cases::account_sync::AccountSyncUseCases;
use crate::application::use_cases::pager::{self, PagedResults};
use crate::domain::entities::cancel_behavior::{
    CancelBehavior, ChangeTiming, RefundType, SubscriptionDisplay,
};
use crate::domain::entities::remote_account::BillingInfo;
use crate::domain::entities::remote_plan::{CouponRedemption, RemoteInvoice, RemotePlan};
use crate::domain::entities::remote_subscription::{
    self, RemoteSubscription, SubscriptionState,
};

/// Memo of past-due subscription uuids per account. Deriving display states
/// for a listing would otherwise query the provider once per subscription.
/// Scoped to a request; workflows that settle invoices clear it.
#[derive(Default)]
pub struct PastDueCache {
    by_account: Mutex<HashMap<String, HashSet<String>>>,
}

impl PastDueCache {
    pub fn clear(&self) {
        if let Ok(mut cache) = self.by_account.lock() {
            cache.clear();
        }
    }

    fn get(&self, account_code: &str) -> Option<HashSet<String>> {
        self.by_account
            .lock()
            .ok()
            .and_then(|cache| cache.get(account_code).cloned())
    }

    fn put(&self, account_code: &str, uuids: HashSet<String>) {
        if let Ok(mut cache) = self.by_account.lock() {
            cache.insert(account_code.to_string(), uuids);
        }
    }
}

/// Installation-wide behavior switches, resolved from configuration once at
/// startup.
#[derive(Debug, Clone)]
pub struct SubscriptionSettings {
    pub cancel_behavior: CancelBehavior,
    /// Whether plan and quantity changes bill immediately or at renewal.
    pub change_timing: ChangeTiming,
    pub display: SubscriptionDisplay,
    pub per_page: usize,
    /// When set, an entity may hold at most one live subscription and signup
    /// is rejected while one exists.
    pub single_subscription: bool,
    /// Plan codes offered for signup and plan changes. Empty means all plans.
    pub enabled_plans: Vec<String>,
    /// Whether quantities above 1 may be purchased.
    pub allow_quantity: bool,
    /// Whether the coupon redemption endpoint is available.
    pub coupon_page_enabled: bool,
}

impl SubscriptionSettings {
    fn plan_enabled(&self, plan_code: &str) -> bool {
        self.enabled_plans.is_empty() || self.enabled_plans.iter().any(|p| p == plan_code)
    }
}

/// A subscription decorated for display: derived states plus the operation
/// links the current installation offers for it.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummary {
    #[serde(flatten)]
    pub subscription: RemoteSubscription,
    pub states: Vec<SubscriptionState>,
    pub links: Vec<OperationLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanPreview {
    pub plan_code: String,
    /// What the subscription would bill per period on the new plan.
    pub cost_in_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuantityPreview {
    pub quantity: u32,
    /// What the subscription would bill per period at the new quantity.
    pub cost_in_cents: i64,
    pub currency: String,
}

pub struct SubscriptionUseCases {
    remote: Arc<dyn RemoteBillingPort>,
    accounts: Arc<AccountSyncUseCases>,
    hooks: Arc<BillingHooks>,
    settings: SubscriptionSettings,
}

impl SubscriptionUseCases {
    pub fn new(
        remote: Arc<dyn RemoteBillingPort>,
        accounts: Arc<AccountSyncUseCases>,
        hooks: Arc<BillingHooks>,
        settings: SubscriptionSettings,
    ) -> Self {
        Self {
            remote,
            accounts,
            hooks,
            settings,
        }
    }

    pub fn settings(&self) -> &SubscriptionSettings {
        &self.settings
    }

    /// Past-due subscription uuids for an account, memoized per request.
    pub async fn past_due_uuids(
        &self,
        account_code: &str,
        cache: &PastDueCache,
    ) -> AppResult<HashSet<String>> {
        if let Some(cached) = cache.get(account_code) {
            return Ok(cached);
        }

        let mut cursor = self
            .remote
            .subscriptions_for_account(
                account_code,
                Some(SubscriptionStateFilter::PastDue),
                self.settings.per_page,
            )
            .await?;
        let mut uuids = HashSet::new();
        while let Some(subscription) = cursor.next().await? {
            uuids.insert(subscription.uuid);
        }
        cache.put(account_code, uuids.clone());
        Ok(uuids)
    }

    /// One page of subscription summaries for an account. `display` overrides
    /// the configured listing mode.
    pub async fn list(
        &self,
        entity_type: &str,
        entity_id: i64,
        account_code: &str,
        display: Option<SubscriptionDisplay>,
        page: usize,
        cache: &PastDueCache,
    ) -> AppResult<PagedResults<SubscriptionSummary>> {
        let display = display.unwrap_or(self.settings.display);
        let filter = match display {
            SubscriptionDisplay::Live => Some(SubscriptionStateFilter::Active),
            SubscriptionDisplay::All => None,
        };

        let mut cursor = self
            .remote
            .subscriptions_for_account(account_code, filter, self.settings.per_page)
            .await?;
        let raw = pager::pager_results(cursor.as_mut(), self.settings.per_page, page).await?;

        let past_due = self.past_due_uuids(account_code, cache).await?;
        let now = Utc::now();
        let items = raw
            .items
            .into_iter()
            .map(|subscription| self.summarize(entity_type, entity_id, subscription, &past_due, now))
            .collect();

        Ok(PagedResults {
            items,
            total: raw.total,
            per_page: raw.per_page,
            page: raw.page,
        })
    }

    /// A single subscription, decorated, with ownership checked against the
    /// account code.
    pub async fn get(
        &self,
        entity_type: &str,
        entity_id: i64,
        account_code: &str,
        uuid: &str,
        cache: &PastDueCache,
    ) -> AppResult<SubscriptionSummary> {
        let subscription = self.owned_subscription(account_code, uuid).await?;
        let past_due = self.past_due_uuids(account_code, cache).await?;
        Ok(self.summarize(entity_type, entity_id, subscription, &past_due, Utc::now()))
    }

    /// Creates a subscription for an entity, creating the remote account on
    /// first signup.
    pub async fn signup(
        &self,
        entity: &LocalEntity,
        plan_code: &str,
        currency: &str,
        quantity: u32,
        coupon_code: Option<&str>,
    ) -> AppResult<RemoteSubscription> {
        if quantity == 0 {
            return Err(AppError::field("quantity", "Quantity must be at least 1."));
        }
        if quantity > 1 && !self.settings.allow_quantity {
            return Err(AppError::field(
                "quantity",
                "Multiple quantities are not offered.",
            ));
        }
        if !self.settings.plan_enabled(plan_code) {
            return Err(AppError::field("plan_code", "This plan is not available."));
        }

        let plan = self.remote.get_plan(plan_code).await?;
        if plan.price_for(currency).is_none() {
            return Err(AppError::field(
                "currency",
                "The plan is not offered in this currency.",
            ));
        }

        if let Some(code) = coupon_code {
            self.check_coupon(code, plan_code).await?;
        }

        let mapping = self.accounts.ensure_account(entity).await?;

        if self.settings.single_subscription {
            let mut live = self
                .remote
                .subscriptions_for_account(
                    &mapping.account_code,
                    Some(SubscriptionStateFilter::Active),
                    1,
                )
                .await?;
            if live.next().await?.is_some() {
                return Err(AppError::InvalidInput(
                    "This account already has an active subscription.".to_string(),
                ));
            }
        }

        let subscription = self
            .remote
            .create_subscription(NewSubscription {
                account_code: mapping.account_code.clone(),
                plan_code: plan_code.to_string(),
                currency: currency.to_string(),
                quantity,
                coupon_code: coupon_code.map(str::to_string),
            })
            .await?;
        info!(
            account_code = %mapping.account_code,
            plan_code,
            uuid = %subscription.uuid,
            "created subscription"
        );
        self.hooks.notify_subscription_created(&subscription);
        Ok(subscription)
    }

    /// Non-committing preview of a plan change.
    pub async fn preview_plan(
        &self,
        account_code: &str,
        uuid: &str,
        new_plan_code: &str,
    ) -> AppResult<PlanPreview> {
        self.check_plan_change(account_code, uuid, new_plan_code)
            .await?;
        let preview = self
            .remote
            .preview_change(uuid, &self.plan_change(new_plan_code))
            .await?;
        Ok(PlanPreview {
            plan_code: new_plan_code.to_string(),
            cost_in_cents: preview.cost_in_cents,
            currency: preview.currency,
        })
    }

    /// Moves a subscription to another plan. Whether the change bills now or
    /// at renewal is an installation-wide setting, not a caller choice.
    pub async fn change_plan(
        &self,
        account_code: &str,
        uuid: &str,
        new_plan_code: &str,
    ) -> AppResult<RemoteSubscription> {
        self.check_plan_change(account_code, uuid, new_plan_code)
            .await?;
        let updated = self
            .remote
            .apply_change(uuid, &self.plan_change(new_plan_code))
            .await?;
        self.hooks.notify_subscription_updated(&updated);
        Ok(updated)
    }

    async fn check_plan_change(
        &self,
        account_code: &str,
        uuid: &str,
        new_plan_code: &str,
    ) -> AppResult<()> {
        if !self.settings.plan_enabled(new_plan_code) {
            return Err(AppError::field("plan_code", "This plan is not available."));
        }
        let subscription = self.owned_subscription(account_code, uuid).await?;
        if subscription.plan_code == new_plan_code {
            return Err(AppError::field(
                "plan_code",
                "The subscription is already on this plan.",
            ));
        }
        // Reject unknown plans before touching the subscription.
        self.remote.get_plan(new_plan_code).await?;
        Ok(())
    }

    fn plan_change(&self, new_plan_code: &str) -> SubscriptionChange {
        SubscriptionChange {
            plan_code: Some(new_plan_code.to_string()),
            quantity: None,
            timing: self.settings.change_timing,
        }
    }

    fn quantity_change(&self, quantity: u32) -> SubscriptionChange {
        SubscriptionChange {
            plan_code: None,
            quantity: Some(quantity),
            timing: self.settings.change_timing,
        }
    }

    /// Non-committing preview of a quantity change.
    pub async fn preview_quantity(
        &self,
        account_code: &str,
        uuid: &str,
        quantity: u32,
    ) -> AppResult<QuantityPreview> {
        if quantity == 0 {
            return Err(AppError::field("quantity", "Quantity must be at least 1."));
        }
        if quantity > 1 && !self.settings.allow_quantity {
            return Err(AppError::field(
                "quantity",
                "Multiple quantities are not offered.",
            ));
        }
        let subscription = self.owned_subscription(account_code, uuid).await?;
        if subscription.quantity == quantity {
            return Err(AppError::field(
                "quantity",
                "The subscription already has this quantity.",
            ));
        }

        let preview = self
            .remote
            .preview_change(uuid, &self.quantity_change(quantity))
            .await?;
        Ok(QuantityPreview {
            quantity,
            cost_in_cents: preview.cost_in_cents,
            currency: preview.currency,
        })
    }

    /// Commits a previously previewed quantity change. The preview is re-run
    /// server-side and must still produce the cost the caller saw; a price
    /// that moved in between aborts the change without committing anything.
    pub async fn confirm_quantity(
        &self,
        account_code: &str,
        uuid: &str,
        quantity: u32,
        expected_cost_in_cents: i64,
        cache: &PastDueCache,
    ) -> AppResult<RemoteSubscription> {
        let preview = self.preview_quantity(account_code, uuid, quantity).await?;
        if preview.cost_in_cents != expected_cost_in_cents {
            return Err(AppError::field(
                "expected_cost_in_cents",
                "The price has changed since the preview. Review the new price and try again.",
            ));
        }

        let updated = self
            .remote
            .apply_change(uuid, &self.quantity_change(quantity))
            .await?;
        // The immediate charge or credit may settle a past-due invoice.
        cache.clear();
        self.hooks.notify_subscription_updated(&updated);
        Ok(updated)
    }

    /// Ends a subscription according to the configured cancel behavior:
    /// cancel at renewal, or terminate now with a partial or full refund.
    /// A past-due subscription always terminates without a refund, since
    /// there is nothing paid to give back.
    pub async fn cancel(
        &self,
        account_code: &str,
        uuid: &str,
        cache: &PastDueCache,
    ) -> AppResult<RemoteSubscription> {
        self.owned_subscription(account_code, uuid).await?;
        let past_due = self.past_due_uuids(account_code, cache).await?;

        let updated = if past_due.contains(uuid) {
            self.remote
                .terminate_subscription(uuid, RefundType::None)
                .await?
        } else {
            match self.settings.cancel_behavior {
                CancelBehavior::Cancel => self.remote.cancel_subscription(uuid).await?,
                CancelBehavior::TerminateProrated => {
                    self.remote
                        .terminate_subscription(uuid, RefundType::Partial)
                        .await?
                }
                CancelBehavior::TerminateFull => {
                    self.remote
                        .terminate_subscription(uuid, RefundType::Full)
                        .await?
                }
            }
        };
        info!(uuid, behavior = self.settings.cancel_behavior.as_ref(), "ended subscription");
        cache.clear();
        self.hooks.notify_subscription_updated(&updated);
        Ok(updated)
    }

    /// Undoes a pending cancellation. Only canceled (not yet expired)
    /// subscriptions can be reactivated.
    pub async fn reactivate(&self, account_code: &str, uuid: &str) -> AppResult<RemoteSubscription> {
        let subscription = self.owned_subscription(account_code, uuid).await?;
        if subscription.state != remote_subscription::BaseState::Canceled {
            return Err(AppError::InvalidInput(
                "Only canceled subscriptions can be reactivated.".to_string(),
            ));
        }
        let updated = self.remote.reactivate_subscription(uuid).await?;
        self.hooks.notify_subscription_updated(&updated);
        Ok(updated)
    }

    pub async fn redeem_coupon(
        &self,
        account_code: &str,
        coupon_code: &str,
        currency: &str,
        plan_code: Option<&str>,
    ) -> AppResult<CouponRedemption> {
        if !self.settings.coupon_page_enabled {
            return Err(AppError::NotFound);
        }
        if let Some(plan_code) = plan_code {
            self.check_coupon(coupon_code, plan_code).await?;
        } else {
            let coupon = self.remote.get_coupon(coupon_code).await?;
            if !coupon.is_redeemable() {
                return Err(AppError::field(
                    "coupon_code",
                    "The coupon is no longer redeemable.",
                ));
            }
        }
        self.remote
            .redeem_coupon(coupon_code, account_code, currency)
            .await
    }

    pub async fn plans(&self) -> AppResult<Vec<RemotePlan>> {
        self.remote.list_plans().await
    }

    pub async fn plan(&self, plan_code: &str) -> AppResult<RemotePlan> {
        self.remote.get_plan(plan_code).await
    }

    pub async fn invoices(
        &self,
        account_code: &str,
        page: usize,
    ) -> AppResult<PagedResults<RemoteInvoice>> {
        let mut cursor = self
            .remote
            .invoices_for_account(account_code, self.settings.per_page)
            .await?;
        pager::pager_results(cursor.as_mut(), self.settings.per_page, page).await
    }

    /// A single invoice, with ownership checked so one account cannot read
    /// another's invoices by number.
    pub async fn invoice(
        &self,
        account_code: &str,
        invoice_number: &str,
    ) -> AppResult<RemoteInvoice> {
        let invoice = self.remote.get_invoice(invoice_number).await?;
        if invoice.account_code != account_code {
            return Err(AppError::NotFound);
        }
        Ok(invoice)
    }

    pub async fn invoice_pdf(&self, account_code: &str, invoice_number: &str) -> AppResult<Vec<u8>> {
        // Ownership check first; the PDF endpoint leaks nothing about other
        // accounts' invoice numbers.
        self.invoice(account_code, invoice_number).await?;
        self.remote.invoice_pdf(invoice_number).await
    }

    pub async fn billing_info(&self, account_code: &str) -> AppResult<BillingInfo> {
        self.remote.get_billing_info(account_code).await
    }

    /// Replaces the payment details on file. Always a full-resource update;
    /// partial card edits are not a thing the provider supports.
    pub async fn update_billing_info(
        &self,
        account_code: &str,
        info: &BillingInfo,
        cache: &PastDueCache,
    ) -> AppResult<BillingInfo> {
        let updated = self.remote.update_billing_info(account_code, info).await?;
        // A new card may clear past-due invoices on the next retry.
        cache.clear();
        Ok(updated)
    }

    async fn owned_subscription(
        &self,
        account_code: &str,
        uuid: &str,
    ) -> AppResult<RemoteSubscription> {
        let subscription = self.remote.get_subscription(uuid).await?;
        if subscription.account_code != account_code {
            return Err(AppError::NotFound);
        }
        Ok(subscription)
    }

    async fn check_coupon(&self, coupon_code: &str, plan_code: &str) -> AppResult<()> {
        let coupon = self.remote.get_coupon(coupon_code).await?;
        if !coupon.is_redeemable() {
            return Err(AppError::field(
                "coupon_code",
                "The coupon is no longer redeemable.",
            ));
        }
        if !coupon.applies_to(plan_code) {
            return Err(AppError::field(
                "coupon_code",
                "The coupon does not apply to this plan.",
            ));
        }
        Ok(())
    }

    fn summarize(
        &self,
        entity_type: &str,
        entity_id: i64,
        subscription: RemoteSubscription,
        past_due: &HashSet<String>,
        now: chrono::DateTime<Utc>,
    ) -> SubscriptionSummary {
        let states = remote_subscription::derive_states(&subscription, past_due, now);
        let context = UrlContext {
            entity_type: entity_type.to_string(),
            entity_id,
            subscription_uuid: subscription.uuid.clone(),
        };
        let mut links = self.operation_links(&context, &states);
        self.hooks.alter_subscription_links(&subscription, &mut links);
        SubscriptionSummary {
            subscription,
            states,
            links,
        }
    }

    fn operation_links(
        &self,
        context: &UrlContext,
        states: &[SubscriptionState],
    ) -> Vec<OperationLink> {
        let canceled = states.contains(&SubscriptionState::Canceled);
        let expired = states.contains(&SubscriptionState::Expired);

        let mut operations: Vec<&str> = Vec::new();
        if !canceled && !expired {
            operations.push("change_plan");
            if self.settings.allow_quantity {
                operations.push("quantity");
            }
            operations.push("cancel");
            operations.push("update_billing");
        }
        if canceled && !expired {
            operations.push("reactivate");
        }

        operations
            .into_iter()
            .filter_map(|operation| {
                self.hooks.resolve_url(operation, context).map(|href| OperationLink {
                    rel: operation.to_string(),
                    href,
                })
            })
            .collect()
    }
}
