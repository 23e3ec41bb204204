use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use thiserror::Error;

/// Notification types that change account state and require the local
/// mapping to be reconciled.
const ACCOUNT_SYNC_TYPES: &[&str] = &[
    "new_account_notification",
    "new_subscription_notification",
    "canceled_account_notification",
    "reactivated_account_notification",
    "billing_info_updated_notification",
];

#[derive(Debug, Error)]
pub enum PushParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("missing or unrecognizable notification type")]
    MissingType,
    #[error("truncated XML: the root element is never closed")]
    Truncated,
}

/// Partial account data embedded in a notification. Used as a fallback when
/// the full remote account cannot be fetched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationAccount {
    pub account_code: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationSubscription {
    pub uuid: Option<String>,
    pub plan_code: Option<String>,
    pub plan_name: Option<String>,
    pub state: Option<String>,
    pub quantity: Option<u32>,
    pub current_period_ends_at: Option<DateTime<Utc>>,
}

/// An inbound push notification. Ephemeral: validated, dispatched to hooks,
/// then discarded.
#[derive(Debug, Clone, Serialize)]
pub struct PushNotification {
    /// The XML root element name, e.g. `new_subscription_notification`.
    pub notification_type: String,
    pub account: Option<NotificationAccount>,
    pub subscription: Option<NotificationSubscription>,
}

impl PushNotification {
    /// Parses a provider push-notification body. The root element names the
    /// notification type; `<account>` and `<subscription>` children are
    /// picked up when present, unknown elements are skipped.
    pub fn from_xml(body: &str) -> Result<Self, PushParseError> {
        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(true);

        let mut notification_type: Option<String> = None;
        let mut account: Option<NotificationAccount> = None;
        let mut subscription: Option<NotificationSubscription> = None;

        // Element path relative to the root, e.g. ["account", "account_code"].
        let mut path: Vec<String> = Vec::new();
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                    if depth == 0 {
                        notification_type = Some(name);
                    } else {
                        match (depth, name.as_str()) {
                            (1, "account") => account = Some(NotificationAccount::default()),
                            (1, "subscription") => {
                                subscription = Some(NotificationSubscription::default())
                            }
                            _ => {}
                        }
                        path.push(name);
                    }
                    depth += 1;
                }
                Event::End(_) => {
                    depth -= 1;
                    if depth > 0 {
                        path.pop();
                    }
                }
                Event::Text(text) => {
                    let value = text.unescape()?.into_owned();
                    if value.is_empty() {
                        continue;
                    }
                    Self::assign(&path, &value, &mut account, &mut subscription);
                }
                // quick-xml does not flag an unclosed element at end of input
                // on its own; an open root here means a truncated body.
                Event::Eof => {
                    if depth != 0 {
                        return Err(PushParseError::Truncated);
                    }
                    break;
                }
                _ => {}
            }
        }

        let notification_type = notification_type.ok_or(PushParseError::MissingType)?;
        if !notification_type.ends_with("_notification") {
            return Err(PushParseError::MissingType);
        }

        Ok(Self {
            notification_type,
            account,
            subscription,
        })
    }

    fn assign(
        path: &[String],
        value: &str,
        account: &mut Option<NotificationAccount>,
        subscription: &mut Option<NotificationSubscription>,
    ) {
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        match segments.as_slice() {
            ["account", field] => {
                if let Some(account) = account {
                    match *field {
                        "account_code" => account.account_code = value.to_string(),
                        "username" => account.username = Some(value.to_string()),
                        "email" => account.email = Some(value.to_string()),
                        "first_name" => account.first_name = Some(value.to_string()),
                        "last_name" => account.last_name = Some(value.to_string()),
                        "company_name" => account.company_name = Some(value.to_string()),
                        _ => {}
                    }
                }
            }
            ["subscription", field] => {
                if let Some(subscription) = subscription {
                    match *field {
                        "uuid" => subscription.uuid = Some(value.to_string()),
                        "state" => subscription.state = Some(value.to_string()),
                        "quantity" => subscription.quantity = value.parse().ok(),
                        "current_period_ends_at" => {
                            subscription.current_period_ends_at = DateTime::parse_from_rfc3339(value)
                                .ok()
                                .map(|dt| dt.with_timezone(&Utc));
                        }
                        _ => {}
                    }
                }
            }
            ["subscription", "plan", field] => {
                if let Some(subscription) = subscription {
                    match *field {
                        "plan_code" => subscription.plan_code = Some(value.to_string()),
                        "name" => subscription.plan_name = Some(value.to_string()),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Whether this notification type should trigger an account-mapping sync.
    pub fn affects_account(&self) -> bool {
        ACCOUNT_SYNC_TYPES.contains(&self.notification_type.as_str())
    }
}
