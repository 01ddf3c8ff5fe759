// packages/interpose/src/utils/mod.rs
//! Shared plumbing: error types and configuration

pub mod config;
pub mod errors;

pub use config::MockConfig;
pub use errors::{MockError, Result};
