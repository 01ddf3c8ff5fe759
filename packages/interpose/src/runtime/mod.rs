// packages/interpose/src/runtime/mod.rs
//! Collaborators and the code that calls them
//!
//! The default bindings and a few wrappers that resolve them through the
//! registry. They are the code under test in the crate's own tests, and show
//! the shapes the interception layer is built for:
//!
//! - **System**: `sleep_for` shells out through `base.system`
//! - **Transport**: real HTTP fetch behind `curl.fetch_memory`
//! - **HTTP**: `http_get`, which reaches the transport two calls down
//! - **Docs**: `open_docs`, gated on the primitive interactive check via a
//!   caller-owned wrapper
//! - **Builtins**: installs all of the above into a registry

pub mod builtins;
pub mod docs;
pub mod http;
pub mod system;
pub mod transport;

// Re-export commonly used types
pub use docs::{open_docs, DocsOutcome};
pub use http::{http_get, Response};
pub use system::sleep_for;
