//! In-memory mock implementations of the persistence and billing ports.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::{
    application::app_error::{AppError, AppResult},
    application::ports::account_mapping_repo::AccountMappingRepo,
    application::ports::billing_remote::{
        InvoiceCursor, NewAccount, NewSubscription, RemoteBillingPort, RemoteCursor,
        SubscriptionChange, SubscriptionCursor, SubscriptionStateFilter,
    },
    application::ports::local_entities::{LocalEntity, LocalEntityRepo},
    domain::entities::account_mapping::AccountMapping,
    domain::entities::cancel_behavior::RefundType,
    domain::entities::remote_account::{BillingInfo, RemoteAccount},
    domain::entities::remote_plan::{
        CouponRedemption, RemoteCoupon, RemoteInvoice, RemotePlan, SubscriptionPreview,
    },
    domain::entities::remote_subscription::{BaseState, RemoteSubscription},
};

// ============================================================================
// InMemoryAccountMappingRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryAccountMappingRepo {
    /// Keyed by account_code, mirroring the table's primary key.
    pub mappings: Mutex<HashMap<String, AccountMapping>>,
}

impl InMemoryAccountMappingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mappings(mappings: Vec<AccountMapping>) -> Self {
        let map = mappings
            .into_iter()
            .map(|m| (m.account_code.clone(), m))
            .collect();
        Self {
            mappings: Mutex::new(map),
        }
    }
}

#[async_trait]
impl AccountMappingRepo for InMemoryAccountMappingRepo {
    async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> AppResult<Option<AccountMapping>> {
        Ok(self
            .mappings
            .lock()
            .unwrap()
            .values()
            .find(|m| m.entity_type == entity_type && m.entity_id == entity_id)
            .cloned())
    }

    async fn find_by_account_code(
        &self,
        account_code: &str,
    ) -> AppResult<Option<AccountMapping>> {
        Ok(self.mappings.lock().unwrap().get(account_code).cloned())
    }

    async fn upsert(&self, mapping: &AccountMapping) -> AppResult<()> {
        self.mappings
            .lock()
            .unwrap()
            .insert(mapping.account_code.clone(), mapping.clone());
        Ok(())
    }

    async fn delete_by_entity(&self, entity_type: &str, entity_id: i64) -> AppResult<()> {
        self.mappings
            .lock()
            .unwrap()
            .retain(|_, m| !(m.entity_type == entity_type && m.entity_id == entity_id));
        Ok(())
    }
}

// ============================================================================
// InMemoryLocalEntityRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryLocalEntityRepo {
    pub entities: Mutex<Vec<LocalEntity>>,
}

impl InMemoryLocalEntityRepo {
    pub fn with_entities(entities: Vec<LocalEntity>) -> Self {
        Self {
            entities: Mutex::new(entities),
        }
    }
}

#[async_trait]
impl LocalEntityRepo for InMemoryLocalEntityRepo {
    async fn get(&self, entity_type: &str, entity_id: i64) -> AppResult<Option<LocalEntity>> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<LocalEntity>> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
                e.entity_type == "user"
                    && e.email
                        .as_deref()
                        .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .cloned())
    }
}

// ============================================================================
// MockBillingRemote
// ============================================================================

/// Records every call it receives so tests can assert on what was (or was
/// not) sent to the provider.
#[derive(Default)]
pub struct MockBillingRemote {
    pub accounts: Mutex<HashMap<String, RemoteAccount>>,
    pub subscriptions: Mutex<HashMap<String, RemoteSubscription>>,
    pub plans: Mutex<HashMap<String, RemotePlan>>,
    pub coupons: Mutex<HashMap<String, RemoteCoupon>>,
    pub invoices: Mutex<HashMap<String, RemoteInvoice>>,
    pub billing_infos: Mutex<HashMap<String, BillingInfo>>,
    /// Uuids the past-due state filter reports.
    pub past_due: Mutex<HashSet<String>>,
    /// Overrides the computed preview cost, to simulate a price that moved
    /// between preview and confirm.
    pub preview_cost_override: Mutex<Option<i64>>,
    /// When set, every call fails as a provider outage.
    pub unavailable: Mutex<bool>,
    pub calls: Mutex<Vec<String>>,
}

impl MockBillingRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    fn check_available(&self) -> AppResult<()> {
        if *self.unavailable.lock().unwrap() {
            return Err(AppError::RemoteUnavailable("mock outage".to_string()));
        }
        Ok(())
    }

    fn preview_for(&self, subscription: &RemoteSubscription, change: &SubscriptionChange) -> SubscriptionPreview {
        let quantity = change.quantity.unwrap_or(subscription.quantity);
        let cost = self
            .preview_cost_override
            .lock()
            .unwrap()
            .unwrap_or(subscription.unit_amount_in_cents * i64::from(quantity));
        SubscriptionPreview {
            cost_in_cents: cost,
            currency: subscription.currency.clone(),
            charge_invoice: None,
            credit_invoices: vec![],
        }
    }
}

struct VecCursor<T> {
    items: Vec<T>,
    pos: usize,
}

#[async_trait]
impl<T: Send> RemoteCursor<T> for VecCursor<T>
where
    T: Clone,
{
    fn total(&self) -> usize {
        self.items.len()
    }

    async fn next(&mut self) -> AppResult<Option<T>> {
        let item = self.items.get(self.pos).cloned();
        self.pos += 1;
        Ok(item)
    }
}

#[async_trait]
impl RemoteBillingPort for MockBillingRemote {
    async fn get_account(&self, account_code: &str) -> AppResult<RemoteAccount> {
        self.check_available()?;
        self.record(format!("get_account:{account_code}"));
        self.accounts
            .lock()
            .unwrap()
            .get(account_code)
            .cloned()
            .ok_or_else(|| AppError::RemoteNotFound(account_code.to_string()))
    }

    async fn create_account(&self, account: NewAccount) -> AppResult<RemoteAccount> {
        self.check_available()?;
        self.record(format!("create_account:{}", account.account_code));
        let created = RemoteAccount {
            account_code: account.account_code.clone(),
            username: account.username,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            company_name: account.company_name,
            state: Some("active".to_string()),
            address: account.address.unwrap_or_default(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(account.account_code, created.clone());
        Ok(created)
    }

    async fn update_account(&self, account: &RemoteAccount) -> AppResult<RemoteAccount> {
        self.check_available()?;
        self.record(format!("update_account:{}", account.account_code));
        let mut accounts = self.accounts.lock().unwrap();
        if !accounts.contains_key(&account.account_code) {
            return Err(AppError::RemoteNotFound(account.account_code.clone()));
        }
        accounts.insert(account.account_code.clone(), account.clone());
        Ok(account.clone())
    }

    async fn close_account(&self, account_code: &str) -> AppResult<()> {
        self.check_available()?;
        self.record(format!("close_account:{account_code}"));
        self.accounts
            .lock()
            .unwrap()
            .remove(account_code)
            .map(|_| ())
            .ok_or_else(|| AppError::RemoteNotFound(account_code.to_string()))
    }

    async fn get_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription> {
        self.check_available()?;
        self.record(format!("get_subscription:{uuid}"));
        self.subscriptions
            .lock()
            .unwrap()
            .get(uuid)
            .cloned()
            .ok_or_else(|| AppError::RemoteNotFound(uuid.to_string()))
    }

    async fn subscriptions_for_account(
        &self,
        account_code: &str,
        filter: Option<SubscriptionStateFilter>,
        _per_page: usize,
    ) -> AppResult<SubscriptionCursor> {
        self.check_available()?;
        self.record(format!("list_subscriptions:{account_code}:{filter:?}"));
        let past_due = self.past_due.lock().unwrap().clone();
        let items: Vec<RemoteSubscription> = self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.account_code == account_code)
            .filter(|s| match filter {
                None => true,
                Some(SubscriptionStateFilter::Active) => s.state == BaseState::Active,
                Some(SubscriptionStateFilter::PastDue) => past_due.contains(&s.uuid),
            })
            .cloned()
            .collect();
        Ok(Box::new(VecCursor { items, pos: 0 }))
    }

    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> AppResult<RemoteSubscription> {
        self.check_available()?;
        self.record(format!(
            "create_subscription:{}:{}",
            subscription.account_code, subscription.plan_code
        ));
        let unit_amount_in_cents = self
            .plans
            .lock()
            .unwrap()
            .get(&subscription.plan_code)
            .and_then(|p| p.price_for(&subscription.currency))
            .unwrap_or(1000);
        let created = RemoteSubscription {
            uuid: format!("uuid-{}-{}", subscription.account_code, subscription.plan_code),
            account_code: subscription.account_code,
            plan_code: subscription.plan_code,
            plan_name: None,
            state: BaseState::Active,
            unit_amount_in_cents,
            quantity: subscription.quantity,
            currency: subscription.currency,
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
        };
        self.subscriptions
            .lock()
            .unwrap()
            .insert(created.uuid.clone(), created.clone());
        Ok(created)
    }

    async fn preview_change(
        &self,
        uuid: &str,
        change: &SubscriptionChange,
    ) -> AppResult<SubscriptionPreview> {
        self.check_available()?;
        self.record(format!("preview_change:{uuid}"));
        let subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get(uuid)
            .ok_or_else(|| AppError::RemoteNotFound(uuid.to_string()))?;
        Ok(self.preview_for(subscription, change))
    }

    async fn apply_change(
        &self,
        uuid: &str,
        change: &SubscriptionChange,
    ) -> AppResult<RemoteSubscription> {
        self.check_available()?;
        self.record(format!("apply_change:{uuid}"));
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(uuid)
            .ok_or_else(|| AppError::RemoteNotFound(uuid.to_string()))?;
        if let Some(plan_code) = &change.plan_code {
            subscription.plan_code = plan_code.clone();
        }
        if let Some(quantity) = change.quantity {
            subscription.quantity = quantity;
        }
        Ok(subscription.clone())
    }

    async fn cancel_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription> {
        self.check_available()?;
        self.record(format!("cancel:{uuid}"));
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(uuid)
            .ok_or_else(|| AppError::RemoteNotFound(uuid.to_string()))?;
        subscription.state = BaseState::Canceled;
        Ok(subscription.clone())
    }

    async fn terminate_subscription(
        &self,
        uuid: &str,
        refund: RefundType,
    ) -> AppResult<RemoteSubscription> {
        self.check_available()?;
        self.record(format!("terminate:{uuid}:{}", refund.as_ref()));
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(uuid)
            .ok_or_else(|| AppError::RemoteNotFound(uuid.to_string()))?;
        subscription.state = BaseState::Expired;
        Ok(subscription.clone())
    }

    async fn reactivate_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription> {
        self.check_available()?;
        self.record(format!("reactivate:{uuid}"));
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(uuid)
            .ok_or_else(|| AppError::RemoteNotFound(uuid.to_string()))?;
        subscription.state = BaseState::Active;
        Ok(subscription.clone())
    }

    async fn get_plan(&self, plan_code: &str) -> AppResult<RemotePlan> {
        self.check_available()?;
        self.record(format!("get_plan:{plan_code}"));
        self.plans
            .lock()
            .unwrap()
            .get(plan_code)
            .cloned()
            .ok_or_else(|| AppError::RemoteNotFound(plan_code.to_string()))
    }

    async fn list_plans(&self) -> AppResult<Vec<RemotePlan>> {
        self.check_available()?;
        self.record("list_plans".to_string());
        let mut plans: Vec<RemotePlan> = self.plans.lock().unwrap().values().cloned().collect();
        plans.sort_by(|a, b| a.plan_code.cmp(&b.plan_code));
        Ok(plans)
    }

    async fn get_coupon(&self, coupon_code: &str) -> AppResult<RemoteCoupon> {
        self.check_available()?;
        self.record(format!("get_coupon:{coupon_code}"));
        self.coupons
            .lock()
            .unwrap()
            .get(coupon_code)
            .cloned()
            .ok_or_else(|| AppError::RemoteNotFound(coupon_code.to_string()))
    }

    async fn redeem_coupon(
        &self,
        coupon_code: &str,
        account_code: &str,
        currency: &str,
    ) -> AppResult<CouponRedemption> {
        self.check_available()?;
        self.record(format!("redeem_coupon:{coupon_code}:{account_code}"));
        Ok(CouponRedemption {
            coupon_code: coupon_code.to_string(),
            account_code: account_code.to_string(),
            currency: currency.to_string(),
            created_at: None,
        })
    }

    async fn invoices_for_account(
        &self,
        account_code: &str,
        _per_page: usize,
    ) -> AppResult<InvoiceCursor> {
        self.check_available()?;
        self.record(format!("list_invoices:{account_code}"));
        let mut items: Vec<RemoteInvoice> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.account_code == account_code)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));
        Ok(Box::new(VecCursor { items, pos: 0 }))
    }

    async fn get_invoice(&self, invoice_number: &str) -> AppResult<RemoteInvoice> {
        self.check_available()?;
        self.record(format!("get_invoice:{invoice_number}"));
        self.invoices
            .lock()
            .unwrap()
            .get(invoice_number)
            .cloned()
            .ok_or_else(|| AppError::RemoteNotFound(invoice_number.to_string()))
    }

    async fn invoice_pdf(&self, invoice_number: &str) -> AppResult<Vec<u8>> {
        self.check_available()?;
        self.record(format!("invoice_pdf:{invoice_number}"));
        if !self.invoices.lock().unwrap().contains_key(invoice_number) {
            return Err(AppError::RemoteNotFound(invoice_number.to_string()));
        }
        Ok(b"%PDF-1.4 test".to_vec())
    }

    async fn get_billing_info(&self, account_code: &str) -> AppResult<BillingInfo> {
        self.check_available()?;
        self.record(format!("get_billing_info:{account_code}"));
        self.billing_infos
            .lock()
            .unwrap()
            .get(account_code)
            .cloned()
            .ok_or_else(|| AppError::RemoteNotFound(account_code.to_string()))
    }

    async fn update_billing_info(
        &self,
        account_code: &str,
        info: &BillingInfo,
    ) -> AppResult<BillingInfo> {
        self.check_available()?;
        self.record(format!("update_billing_info:{account_code}"));
        let mut stored = info.clone();
        stored.last_four = info
            .card_number
            .as_deref()
            .map(|n| n.chars().rev().take(4).collect::<String>().chars().rev().collect());
        stored.card_number = None;
        stored.verification_value = None;
        self.billing_infos
            .lock()
            .unwrap()
            .insert(account_code.to_string(), stored.clone());
        Ok(stored)
    }
}
