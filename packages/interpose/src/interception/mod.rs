// packages/interpose/src/interception/mod.rs
//! Function interception layer
//!
//! This module provides scoped substitution of named functions:
//!
//! - **Binding**: `scope.name` references and type-erased function values
//! - **Registry**: process-wide table every call site resolves through
//! - **Session**: all-or-nothing substitution with guaranteed restoration
//! - **Manual**: hand-driven fallback for primitive bindings
//!
//! # Architecture
//!
//! ```text
//! Test code
//!     │
//!     ├─ run_with_substitutions(subs, block)
//!     │      ├─ validate every binding (unresolvable / primitive → reject)
//!     │      ├─ install all substitutes      ┐
//!     │      ├─ block()                      │ session gate held
//!     │      └─ restore all (finish / Drop)  ┘
//!     │
//!     └─ manual_substitute(binding, value, &mut scope)
//!            └─ restore when the DeferScope drops
//!
//! Code under test → registry.call("curl.fetch_memory", url) → current value
//! ```

pub mod binding;
pub mod manual;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use binding::{BindingKind, BindingRef, FunctionValue};
pub use manual::{manual_substitute, DeferScope};
pub use registry::{BindingInfo, Registry, WeakRegistry};
pub use session::{exclusive, run_with_substitutions, InterceptionSession, SessionGate, Substitutions};
