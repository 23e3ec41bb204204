//! Test utilities: data factories, in-memory port implementations, and a
//! builder for `AppState` wired to mocks.

pub mod app_state_builder;
pub mod factories;
pub mod mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use mocks::*;
