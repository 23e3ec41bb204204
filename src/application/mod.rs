pub mod app_error;
pub mod hooks;
pub mod jwt;
pub mod ports;
pub mod use_cases;
