//! In-process extension points.
//!
//! Other parts of the application (or embedders using this crate as a
//! library) register listeners at startup; the use cases invoke them at the
//! documented moments. Listeners must be cheap, anything slow belongs on a
//! queue behind the listener.

use std::sync::Arc;

use crate::domain::entities::push_notification::PushNotification;
use crate::domain::entities::remote_subscription::RemoteSubscription;

/// Invoked for every authenticated, well-formed push notification, after the
/// account mapping has been reconciled. Failures here never affect the
/// response to the provider.
pub trait PushNotificationListener: Send + Sync {
    fn on_push_notification(&self, notification: &PushNotification, subdomain: &str);
}

/// Invoked when this application creates or modifies a remote subscription
/// through one of its own workflows. Not invoked for changes that arrive via
/// push notifications.
pub trait SubscriptionListener: Send + Sync {
    fn on_subscription_created(&self, subscription: &RemoteSubscription) {
        let _ = subscription;
    }

    fn on_subscription_updated(&self, subscription: &RemoteSubscription) {
        let _ = subscription;
    }
}

/// An operation link shown alongside a subscription in listings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OperationLink {
    pub rel: String,
    pub href: String,
}

/// Where a lifecycle operation URL points. Carries the entity scope the
/// routes are nested under.
#[derive(Debug, Clone)]
pub struct UrlContext {
    pub entity_type: String,
    pub entity_id: i64,
    pub subscription_uuid: String,
}

/// Resolves a named lifecycle operation (`change_plan`, `quantity`, `cancel`,
/// `reactivate`, ...) to a URL. Registered hooks are asked first; the
/// built-in [`DefaultUrlInfo`] answers whatever they decline.
pub trait UrlInfoHook: Send + Sync {
    fn url_for(&self, operation: &str, context: &UrlContext) -> Option<String>;
}

/// Supplies this service's own entity-scoped route URLs.
pub struct DefaultUrlInfo;

impl UrlInfoHook for DefaultUrlInfo {
    fn url_for(&self, operation: &str, context: &UrlContext) -> Option<String> {
        let base = format!(
            "/api/entities/{}/{}/subscription",
            context.entity_type, context.entity_id
        );
        let uuid = &context.subscription_uuid;
        match operation {
            "change_plan" => Some(format!("{base}/{uuid}/plan")),
            "quantity" => Some(format!("{base}/{uuid}/quantity")),
            "cancel" => Some(format!("{base}/{uuid}/cancel")),
            "reactivate" => Some(format!("{base}/{uuid}/reactivate")),
            "update_billing" => Some(format!(
                "/api/entities/{}/{}/billing",
                context.entity_type, context.entity_id
            )),
            "signup" => Some(format!("{base}/signup")),
            _ => None,
        }
    }
}

/// Lets embedders replace or extend the operation links for a subscription.
pub trait SubscriptionLinksListener: Send + Sync {
    fn alter_links(&self, subscription: &RemoteSubscription, links: &mut Vec<OperationLink>);
}

#[derive(Default)]
pub struct BillingHooks {
    push: Vec<Arc<dyn PushNotificationListener>>,
    subscription: Vec<Arc<dyn SubscriptionListener>>,
    links: Vec<Arc<dyn SubscriptionLinksListener>>,
    url_info: Vec<Arc<dyn UrlInfoHook>>,
}

impl BillingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_push_listener(&mut self, listener: Arc<dyn PushNotificationListener>) {
        self.push.push(listener);
    }

    pub fn register_subscription_listener(&mut self, listener: Arc<dyn SubscriptionListener>) {
        self.subscription.push(listener);
    }

    pub fn register_links_listener(&mut self, listener: Arc<dyn SubscriptionLinksListener>) {
        self.links.push(listener);
    }

    pub fn register_url_info(&mut self, hook: Arc<dyn UrlInfoHook>) {
        self.url_info.push(hook);
    }

    /// Resolves an operation URL, preferring registered hooks over the
    /// built-in routes.
    pub fn resolve_url(&self, operation: &str, context: &UrlContext) -> Option<String> {
        self.url_info
            .iter()
            .find_map(|hook| hook.url_for(operation, context))
            .or_else(|| DefaultUrlInfo.url_for(operation, context))
    }

    pub fn notify_push(&self, notification: &PushNotification, subdomain: &str) {
        for listener in &self.push {
            listener.on_push_notification(notification, subdomain);
        }
    }

    pub fn notify_subscription_created(&self, subscription: &RemoteSubscription) {
        for listener in &self.subscription {
            listener.on_subscription_created(subscription);
        }
    }

    pub fn notify_subscription_updated(&self, subscription: &RemoteSubscription) {
        for listener in &self.subscription {
            listener.on_subscription_updated(subscription);
        }
    }

    pub fn alter_subscription_links(
        &self,
        subscription: &RemoteSubscription,
        links: &mut Vec<OperationLink>,
    ) {
        for listener in &self.links {
            listener.alter_links(subscription, links);
        }
    }
}
