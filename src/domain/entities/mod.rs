pub mod account_mapping;
pub mod cancel_behavior;
pub mod push_notification;
pub mod remote_account;
pub mod remote_plan;
pub mod remote_subscription;
