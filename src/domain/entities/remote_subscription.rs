use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state as reported by the provider. Only these appear on the raw
/// record; everything else is derived locally.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::AsRefStr,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BaseState {
    Future,
    Pending,
    Active,
    Canceled,
    Expired,
}

/// Display states for a subscription. A subscription may carry several at
/// once; the base lifecycle state is always present.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::AsRefStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Canceled,
    Expired,
    Future,
    InTrial,
    NonRenewing,
    PastDue,
    Pending,
    PendingSubscription,
}

impl From<BaseState> for SubscriptionState {
    fn from(state: BaseState) -> Self {
        match state {
            BaseState::Future => SubscriptionState::Future,
            BaseState::Pending => SubscriptionState::Pending,
            BaseState::Active => SubscriptionState::Active,
            BaseState::Canceled => SubscriptionState::Canceled,
            BaseState::Expired => SubscriptionState::Expired,
        }
    }
}

/// A plan change scheduled to take effect at the next renewal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChange {
    pub plan_code: String,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionAddOn {
    pub add_on_code: String,
    pub quantity: u32,
    pub unit_amount_in_cents: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw subscription record as fetched from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSubscription {
    pub uuid: String,
    pub account_code: String,
    pub plan_code: String,
    #[serde(default)]
    pub plan_name: Option<String>,
    pub state: BaseState,
    pub unit_amount_in_cents: i64,
    pub quantity: u32,
    pub currency: String,
    #[serde(default = "default_auto_renew")]
    pub auto_renew: bool,
    #[serde(default)]
    pub trial_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_period_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_period_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pending_change: Option<PendingChange>,
    #[serde(default)]
    pub add_ons: Vec<SubscriptionAddOn>,
}

fn default_auto_renew() -> bool {
    true
}

impl RemoteSubscription {
    /// Total cost of the subscription including add-ons, in cents.
    pub fn total_in_cents(&self) -> i64 {
        let add_ons: i64 = self
            .add_ons
            .iter()
            .map(|a| a.unit_amount_in_cents * i64::from(a.quantity))
            .sum();
        self.unit_amount_in_cents * i64::from(self.quantity) + add_ons
    }
}

/// Computes the ordered display-state list for a subscription.
///
/// The raw record only carries the base lifecycle state; `in_trial`,
/// `non_renewing`, `past_due` and `pending_subscription` are figured out here.
/// The past-due set comes from a separate provider query because the base
/// record does not say whether it has unpaid invoices.
///
/// When `canceled` or `expired` is present the list is sorted alphabetically
/// so that cancellation messaging takes precedence over trial messaging.
pub fn derive_states(
    subscription: &RemoteSubscription,
    past_due: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<SubscriptionState> {
    let mut states = Vec::new();

    if let (Some(start), Some(end)) = (subscription.trial_started_at, subscription.trial_ends_at) {
        if start < now && now < end {
            states.push(SubscriptionState::InTrial);
        }
    }

    if !subscription.auto_renew {
        states.push(SubscriptionState::NonRenewing);
    }

    if past_due.contains(&subscription.uuid) {
        states.push(SubscriptionState::PastDue);
    }

    if subscription.pending_change.is_some() {
        states.push(SubscriptionState::PendingSubscription);
    }

    states.push(subscription.state.into());

    if states.contains(&SubscriptionState::Canceled)
        || states.contains(&SubscriptionState::Expired)
    {
        states.sort();
    }

    states
}
