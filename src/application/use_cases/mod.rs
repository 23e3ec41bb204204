pub mod access;
pub mod account_sync;
pub mod pager;
pub mod subscription;
