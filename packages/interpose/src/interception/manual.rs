// packages/interpose/src/interception/manual.rs
//! Manual substitution for bindings sessions refuse to touch
//!
//! Primitive bindings cannot go through [`run_with_substitutions`]. The
//! fallback is the same transaction performed by hand:
//!
//! 1. read and keep the current value
//! 2. unlock the binding and install the substitute
//! 3. register a finaliser on a [`DeferScope`] that puts the original back
//!    and locks the binding again
//!
//! [`manual_substitute`] does all three. The scope runs its finalisers when
//! it is dropped, so the original is back whichever way the surrounding test
//! ends.
//!
//! [`run_with_substitutions`]: crate::interception::session::run_with_substitutions

use crate::interception::binding::FunctionValue;
use crate::interception::registry::Registry;
use crate::interception::session::{exclusive, SessionGate};
use crate::utils::errors::{MockError, Result};
use tracing::{debug, error, info};

type Finalizer = Box<dyn FnOnce() -> Result<()>>;

/// Finalisers to run when the owning scope ends, last registered first
pub struct DeferScope {
    label: String,
    actions: Vec<(String, Finalizer)>,
    _gate: SessionGate,
}

impl DeferScope {
    /// Open a scope. Holds the session gate until dropped.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            actions: Vec::new(),
            _gate: exclusive(),
        }
    }

    /// Register a finaliser
    pub fn defer<F>(&mut self, description: impl Into<String>, action: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        let description = description.into();
        debug!("Scope '{}' deferred: {}", self.label, description);
        self.actions.push((description, Box::new(action)));
    }

    pub fn pending(&self) -> usize {
        self.actions.len()
    }

    /// Run every pending finaliser now, in reverse registration order.
    ///
    /// All finalisers run even if some fail; failures are reported together.
    pub fn run_deferred(&mut self) -> Result<()> {
        let mut failed = Vec::new();
        let mut reasons = Vec::new();

        while let Some((description, action)) = self.actions.pop() {
            if let Err(e) = action() {
                error!("Scope '{}' finaliser '{}' failed: {}", self.label, description, e);
                reasons.push(e.to_string());
                failed.push(description);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(MockError::RestorationFailed {
                bindings: failed,
                reason: reasons.join("; "),
            })
        }
    }
}

impl Drop for DeferScope {
    fn drop(&mut self) {
        if let Err(e) = self.run_deferred() {
            if !std::thread::panicking() {
                panic!("scope '{}' could not run its finalisers: {}", self.label, e);
            }
        }
    }
}

impl std::fmt::Debug for DeferScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferScope")
            .field("label", &self.label)
            .field("pending", &self.actions.len())
            .finish()
    }
}

/// Replace `target` until `scope` ends, whatever kind of binding it is
pub fn manual_substitute(
    registry: &Registry,
    target: &str,
    substitute: FunctionValue,
    scope: &mut DeferScope,
) -> Result<()> {
    let saved = registry.force_swap(target, substitute)?;
    info!(
        "Manually substituted {} until scope '{}' ends",
        saved.binding, scope.label
    );

    let registry = registry.clone();
    scope.defer(format!("restore {}", saved.binding), move || {
        let binding = saved.binding.clone();
        registry.reinstate(saved)?;
        info!("Manually restored {}", binding);
        Ok(())
    });

    Ok(())
}

impl Registry {
    /// Shorthand for [`manual_substitute`] on this registry
    pub fn substitute_until(
        &self,
        target: &str,
        substitute: FunctionValue,
        scope: &mut DeferScope,
    ) -> Result<()> {
        manual_substitute(self, target, substitute, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builtins;
    use std::cell::RefCell;
    use std::io::IsTerminal;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    #[test]
    fn test_finalisers_run_in_reverse() {
        let order = Rc::new(RefCell::new(Vec::new()));
        {
            let mut scope = DeferScope::new("order");
            for i in 0..3 {
                let order = Rc::clone(&order);
                scope.defer(format!("push {i}"), move || {
                    order.borrow_mut().push(i);
                    Ok(())
                });
            }
            assert_eq!(scope.pending(), 3);
        }
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn test_failing_finaliser_does_not_skip_others() {
        let ran = Rc::new(RefCell::new(false));
        let mut scope = DeferScope::new("failing");

        let flag = Rc::clone(&ran);
        scope.defer("set flag", move || {
            *flag.borrow_mut() = true;
            Ok(())
        });
        scope.defer("fail", || Err(MockError::ProcessFailed("nope".to_string())));

        let err = scope.run_deferred().unwrap_err();
        assert!(matches!(err, MockError::RestorationFailed { .. }));
        assert!(*ran.borrow());
        assert_eq!(scope.pending(), 0);
    }

    #[test]
    fn test_manual_substitute_primitive() {
        let registry = Registry::new();
        registry.define_primitive("base.interactive", |_: ()| false).unwrap();
        let original = registry.lookup("base.interactive").unwrap();

        {
            let mut scope = DeferScope::new("primitive");
            manual_substitute(
                &registry,
                "base.interactive",
                FunctionValue::returning::<(), bool>(true),
                &mut scope,
            )
            .unwrap();

            assert!(registry.call::<(), bool>("base.interactive", ()).unwrap());
            assert!(!registry.is_locked("base.interactive").unwrap());
        }

        assert!(registry.lookup("base.interactive").unwrap().same_as(&original));
        assert!(registry.is_locked("base.interactive").unwrap());
    }

    #[test]
    fn test_manual_steps_by_hand() {
        let registry = Registry::new();
        registry.define_primitive("base.interactive", |_: ()| false).unwrap();

        {
            let mut scope = DeferScope::new("by hand");

            let original = registry.lookup("base.interactive").unwrap();
            registry.unlock_binding("base.interactive").unwrap();
            registry
                .assign("base.interactive", FunctionValue::returning::<(), bool>(true))
                .unwrap();

            let handle = registry.clone();
            scope.defer("restore base.interactive", move || {
                handle.assign("base.interactive", original)?;
                handle.lock_binding("base.interactive")
            });

            assert!(registry.call::<(), bool>("base.interactive", ()).unwrap());
        }

        assert!(!registry.call::<(), bool>("base.interactive", ()).unwrap());
        assert!(registry.is_locked("base.interactive").unwrap());
    }

    #[test]
    fn test_restored_when_test_body_panics() {
        let registry = Registry::new();
        registry.define_primitive("base.interactive", |_: ()| false).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut scope = DeferScope::new("panicking");
            registry
                .substitute_until(
                    "base.interactive",
                    FunctionValue::returning::<(), bool>(true),
                    &mut scope,
                )
                .unwrap();
            panic!("assertion failed inside test");
        }));

        assert!(result.is_err());
        assert!(!registry.call::<(), bool>("base.interactive", ()).unwrap());
    }

    #[test]
    fn test_unresolvable_target() {
        let registry = Registry::new();
        let mut scope = DeferScope::new("missing");

        let err = manual_substitute(
            &registry,
            "base.nothing",
            FunctionValue::returning::<(), bool>(true),
            &mut scope,
        )
        .unwrap_err();

        assert!(matches!(err, MockError::UnresolvableBinding { .. }));
        assert_eq!(scope.pending(), 0);
    }

    // The two tests below share the global registry: the first forces the
    // interactive check on, the second checks nothing leaked out of it.

    #[test]
    fn test_force_interactive_in_global_registry() {
        let registry = Registry::global();
        let mut scope = DeferScope::new("force interactive");

        manual_substitute(
            registry,
            builtins::INTERACTIVE,
            FunctionValue::returning::<(), bool>(true),
            &mut scope,
        )
        .unwrap();

        assert!(registry.call::<(), bool>(builtins::INTERACTIVE, ()).unwrap());
    }

    #[test]
    fn test_global_interactive_untouched_by_other_tests() {
        let _gate = exclusive();
        let registry = Registry::global();

        let interactive = registry.call::<(), bool>(builtins::INTERACTIVE, ()).unwrap();
        assert_eq!(interactive, std::io::stdin().is_terminal());
        assert!(registry.is_locked(builtins::INTERACTIVE).unwrap());
    }
}
