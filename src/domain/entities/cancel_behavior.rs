use serde::{Deserialize, Serialize};

/// What "cancel" means for this installation, driven purely by configuration.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CancelBehavior {
    /// Cancel at renewal: the subscription runs out its paid period.
    Cancel,
    /// Terminate immediately, refunding the unused part of the period.
    TerminateProrated,
    /// Terminate immediately with a full refund of the period.
    TerminateFull,
}

/// Refund parameter sent with a termination call.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundType {
    Full,
    Partial,
    None,
}

/// When plan changes and quantity changes take effect.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeTiming {
    /// Apply immediately with prorated charges/credits.
    Now,
    /// Apply at the next renewal.
    Renewal,
}

/// Which subscriptions the listing page shows.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionDisplay {
    /// Active subscriptions only.
    Live,
    /// Everything, including canceled and expired.
    All,
}
