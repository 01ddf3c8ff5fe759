// packages/interpose/src/runtime/builtins.rs
//! Default bindings
//!
//! The collaborators the worked examples depend on, bound under the names
//! code under test resolves them by:
//!
//! | Binding | Kind | Signature |
//! |---|---|---|
//! | `base.system` | closure | `Fn(String) -> i32` |
//! | `base.interactive` | primitive, locked | `Fn(()) -> bool` |
//! | `curl.fetch_memory` | closure, locked | `Fn(String) -> Result<CaptureRecord>` |
//! | `utils.browse_url` | closure | `Fn(String) -> Result<()>` |
//! | `docs.is_interactive` | closure | `Fn(()) -> Result<bool>`, wraps `base.interactive` |

use crate::interception::registry::Registry;
use crate::recording::capture::CaptureRecord;
use crate::runtime::{docs, system, transport};
use crate::utils::config::TransportSettings;
use crate::utils::errors::{MockError, Result};
use std::io::IsTerminal;
use tracing::debug;

pub const SYSTEM: &str = "base.system";
pub const INTERACTIVE: &str = "base.interactive";
pub const FETCH_MEMORY: &str = "curl.fetch_memory";
pub const BROWSE_URL: &str = "utils.browse_url";
pub const IS_INTERACTIVE: &str = "docs.is_interactive";

/// Install the default bindings with default transport settings
pub fn install(registry: &Registry) -> Result<()> {
    install_with(registry, &TransportSettings::default())
}

pub fn install_with(registry: &Registry, transport_settings: &TransportSettings) -> Result<()> {
    registry.define_fn(SYSTEM, |command: String| system::run_system(&command))?;

    registry.define_primitive(INTERACTIVE, |_: ()| std::io::stdin().is_terminal())?;

    let timeout = transport_settings.timeout();
    registry.define_fn(FETCH_MEMORY, move |url: String| -> Result<CaptureRecord> {
        transport::fetch_memory(&url, timeout)
    })?;
    registry.lock_binding(FETCH_MEMORY)?;

    registry.define_fn(BROWSE_URL, |url: String| docs::browse_url(&url))?;

    // Callers own this wrapper, so sessions can rebind it even though the
    // primitive underneath is off limits.
    let weak = registry.downgrade();
    registry.define_fn(IS_INTERACTIVE, move |_: ()| -> Result<bool> {
        let registry = weak.upgrade().ok_or_else(|| MockError::UnresolvableBinding {
            binding: INTERACTIVE.to_string(),
        })?;
        registry.call::<(), bool>(INTERACTIVE, ())
    })?;

    debug!("Installed default bindings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::{BindingKind, DeferScope, FunctionValue, Substitutions};

    #[test]
    fn test_builtin_kinds() {
        let registry = Registry::with_builtins();

        assert_eq!(registry.kind(SYSTEM).unwrap(), BindingKind::Closure);
        assert_eq!(registry.kind(INTERACTIVE).unwrap(), BindingKind::Primitive);
        assert_eq!(registry.kind(FETCH_MEMORY).unwrap(), BindingKind::Closure);
        assert!(registry.is_locked(FETCH_MEMORY).unwrap());
        assert!(!registry.is_locked(BROWSE_URL).unwrap());
    }

    #[test]
    fn test_signatures() {
        let registry = Registry::with_builtins();

        assert!(registry.lookup(SYSTEM).unwrap().accepts::<String, i32>());
        assert!(registry.lookup(INTERACTIVE).unwrap().accepts::<(), bool>());
        assert!(registry
            .lookup(FETCH_MEMORY)
            .unwrap()
            .accepts::<String, Result<CaptureRecord>>());
        assert!(registry.lookup(BROWSE_URL).unwrap().accepts::<String, Result<()>>());
    }

    #[test]
    fn test_install_twice_fails_on_locked_binding() {
        let registry = Registry::with_builtins();
        assert!(install(&registry).is_err());
    }

    #[test]
    fn test_wrapper_follows_primitive() {
        let registry = Registry::with_builtins();
        let mut scope = DeferScope::new("wrapper follows primitive");

        registry
            .substitute_until(INTERACTIVE, FunctionValue::returning::<(), bool>(true), &mut scope)
            .unwrap();
        assert!(registry.call::<(), Result<bool>>(IS_INTERACTIVE, ()).unwrap().unwrap());

        scope.run_deferred().unwrap();
        assert_eq!(
            registry.call::<(), Result<bool>>(IS_INTERACTIVE, ()).unwrap().unwrap(),
            std::io::stdin().is_terminal()
        );
    }

    #[test]
    fn test_wrapper_is_rebindable() {
        let registry = Registry::with_builtins();

        let seen = registry
            .with_mock(
                Substitutions::new()
                    .replace(IS_INTERACTIVE, |_: ()| -> Result<bool> { Ok(true) }),
                || registry.call::<(), Result<bool>>(IS_INTERACTIVE, ()).unwrap(),
            )
            .unwrap();

        assert!(seen.unwrap());
    }

    #[test]
    fn test_wrapper_reports_mismatched_primitive() {
        let registry = Registry::with_builtins();
        let mut scope = DeferScope::new("mismatched primitive");

        registry
            .substitute_until(INTERACTIVE, FunctionValue::returning::<(), i32>(1), &mut scope)
            .unwrap();

        let err = registry
            .call::<(), Result<bool>>(IS_INTERACTIVE, ())
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, MockError::SignatureMismatch { ref binding, .. } if binding == INTERACTIVE));
    }

    #[test]
    fn test_wrapper_outliving_registry() {
        let registry = Registry::with_builtins();
        let wrapper = registry.lookup(IS_INTERACTIVE).unwrap();
        drop(registry);

        let err = wrapper
            .call::<(), Result<bool>>(())
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, MockError::UnresolvableBinding { .. }));
    }
}
