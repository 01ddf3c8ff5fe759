// packages/interpose/src/lib.rs
//! Interpose: scoped function interception
//!
//! Lets tests of network-facing code run without the network by temporarily
//! rebinding the functions that code resolves, then restoring them whatever
//! way the test ends.
//!
//! # Architecture
//!
//! - **interception**: binding registry, substitution sessions, manual fallback
//! - **recording**: capture records, call logs, fixture storage and export
//! - **runtime**: default collaborator bindings and the wrappers that use them
//! - **observability**: logging setup
//! - **utils**: errors and configuration
//!
//! # Example
//!
//! ```no_run
//! use interpose::interception::{Registry, Substitutions};
//! use interpose::recording::CaptureRecord;
//! use interpose::runtime::{builtins, http_get};
//!
//! let registry = Registry::global();
//! let response = registry
//!     .with_mock(
//!         Substitutions::new().replace(
//!             builtins::FETCH_MEMORY,
//!             |url: String| -> interpose::Result<CaptureRecord> {
//!                 Ok(CaptureRecord::new(url, 200).with_header("Host", "httpbin.org"))
//!             },
//!         ),
//!         || http_get(registry, "http://httpbin.org/get"),
//!     )
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(response.header("host"), Some("httpbin.org"));
//! ```

pub mod interception;
pub mod observability;
pub mod recording;
pub mod runtime;
pub mod utils;

// Re-export commonly used types
pub use interception::{
    manual_substitute, run_with_substitutions, DeferScope, FunctionValue, Registry, Substitutions,
};
pub use recording::CaptureRecord;
pub use utils::config::MockConfig;
pub use utils::errors::{MockError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Build information
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}
