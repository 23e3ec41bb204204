use serde::{Deserialize, Serialize};

/// Billing identity on the provider side, 1:1 with a local
/// [`AccountMapping`](super::account_mapping::AccountMapping) via `account_code`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub account_code: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub address: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Payment details attached to a remote account. Updates always carry the
/// full resource; the provider replaces it wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingInfo {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub verification_value: Option<String>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub address: Address,
    /// Last four digits as reported back by the provider; never submitted.
    #[serde(default)]
    pub last_four: Option<String>,
}
