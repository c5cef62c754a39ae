//! Profile Wizard — multi-step student profile completion.

pub mod config;
pub mod error;
pub mod store;
pub mod wizard;
