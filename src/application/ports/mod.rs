pub mod account_mapping_repo;
pub mod billing_remote;
pub mod local_entities;
