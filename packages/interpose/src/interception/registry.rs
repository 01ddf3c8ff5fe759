// packages/interpose/src/interception/registry.rs
//! Process-wide binding table
//!
//! Maps `scope.name` identifiers to function values. Every call site that
//! resolves a function through the registry observes whatever value is bound
//! at call time, which is what lets a session redirect callers several levels
//! below the code under test.

use crate::interception::binding::{BindingKind, BindingRef, FunctionValue};
use crate::runtime::builtins;
use crate::utils::errors::{MockError, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};
use ulid::Ulid;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::with_builtins);

/// A single bound function
#[derive(Debug, Clone)]
struct Slot {
    value: FunctionValue,
    kind: BindingKind,
    locked: bool,
    held_by: Option<Ulid>,
}

type Scopes = HashMap<String, HashMap<String, Slot>>;

/// Snapshot of one binding, for listing
#[derive(Debug, Clone)]
pub struct BindingInfo {
    pub binding: BindingRef,
    pub kind: BindingKind,
    pub locked: bool,
    pub substituted: bool,
    pub signature: &'static str,
}

/// Original state captured when a binding is taken over
#[derive(Debug, Clone)]
pub(crate) struct SavedBinding {
    pub binding: BindingRef,
    pub original: FunctionValue,
    pub was_locked: bool,
}

/// Binding table shared by every handle cloned from it
#[derive(Clone, Default)]
pub struct Registry {
    scopes: Arc<RwLock<Scopes>>,
}

/// Non-owning handle, for function values that call back into the registry
#[derive(Clone)]
pub struct WeakRegistry {
    scopes: Weak<RwLock<Scopes>>,
}

impl WeakRegistry {
    pub fn upgrade(&self) -> Option<Registry> {
        self.scopes.upgrade().map(|scopes| Registry { scopes })
    }
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the default collaborator bindings installed
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        if let Err(e) = builtins::install(&registry) {
            error!("Failed to install default bindings: {}", e);
        }
        info!("Registry initialised with {} bindings", registry.len());
        registry
    }

    /// The process-wide registry
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            scopes: Arc::downgrade(&self.scopes),
        }
    }

    /// Bind `value` to `target`, creating the scope if needed.
    /// Fails if an existing binding is locked.
    pub fn define(&self, target: &str, value: FunctionValue, kind: BindingKind) -> Result<()> {
        let binding = BindingRef::parse(target)?;
        let mut scopes = self.scopes.write();

        let scope = scopes.entry(binding.scope().to_string()).or_default();
        if let Some(existing) = scope.get(binding.name()) {
            check_not_held(&binding, existing)?;
            if existing.locked {
                return Err(MockError::LockedBinding {
                    binding: binding.to_string(),
                });
            }
        }

        debug!("Defining {} binding {}", kind, binding);

        scope.insert(
            binding.name().to_string(),
            Slot {
                value,
                kind,
                locked: false,
                held_by: None,
            },
        );
        Ok(())
    }

    /// Define an ordinary function binding
    pub fn define_fn<A, R, F>(&self, target: &str, f: F) -> Result<()>
    where
        A: 'static,
        R: 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.define(target, FunctionValue::new(f), BindingKind::Closure)
    }

    /// Define a primitive binding. Primitives are locked on definition.
    pub fn define_primitive<A, R, F>(&self, target: &str, f: F) -> Result<()>
    where
        A: 'static,
        R: 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.define(target, FunctionValue::new(f), BindingKind::Primitive)?;
        self.lock_binding(target)
    }

    /// Replace the value of an existing, unlocked binding
    pub fn assign(&self, target: &str, value: FunctionValue) -> Result<()> {
        let binding = BindingRef::parse(target)?;
        let mut scopes = self.scopes.write();
        let slot = slot_mut(&mut scopes, &binding)?;

        if slot.locked {
            return Err(MockError::LockedBinding {
                binding: binding.to_string(),
            });
        }

        slot.value = value;
        Ok(())
    }

    /// Remove a binding, returning its value
    pub fn remove(&self, target: &str) -> Result<FunctionValue> {
        let binding = BindingRef::parse(target)?;
        let mut scopes = self.scopes.write();

        let scope = scopes
            .get_mut(binding.scope())
            .ok_or_else(|| unresolvable(&binding))?;
        let held = scope.get(binding.name()).ok_or_else(|| unresolvable(&binding))?;
        check_not_held(&binding, held)?;
        let slot = scope.remove(binding.name()).ok_or_else(|| unresolvable(&binding))?;

        if scope.is_empty() {
            scopes.remove(binding.scope());
        }

        info!("Removed binding {}", binding);
        Ok(slot.value)
    }

    /// Current value bound at `target`
    pub fn lookup(&self, target: &str) -> Result<FunctionValue> {
        let binding = BindingRef::parse(target)?;
        let scopes = self.scopes.read();
        slot(&scopes, &binding).map(|slot| slot.value.clone())
    }

    pub fn contains(&self, target: &str) -> bool {
        self.lookup(target).is_ok()
    }

    pub fn kind(&self, target: &str) -> Result<BindingKind> {
        let binding = BindingRef::parse(target)?;
        let scopes = self.scopes.read();
        slot(&scopes, &binding).map(|slot| slot.kind)
    }

    /// Whether the binding can be intercepted by a standard session
    pub fn is_rebindable(&self, target: &str) -> Result<bool> {
        Ok(self.kind(target)? == BindingKind::Closure)
    }

    /// Call the function currently bound at `target`.
    ///
    /// The value is cloned out before invocation so the function may itself
    /// resolve other bindings.
    pub fn call<A, R>(&self, target: &str, args: A) -> Result<R>
    where
        A: 'static,
        R: 'static,
    {
        let value = self.lookup(target)?;
        value.call_as(target, args)
    }

    pub fn lock_binding(&self, target: &str) -> Result<()> {
        self.set_locked(target, true)
    }

    pub fn unlock_binding(&self, target: &str) -> Result<()> {
        self.set_locked(target, false)
    }

    pub fn is_locked(&self, target: &str) -> Result<bool> {
        let binding = BindingRef::parse(target)?;
        let scopes = self.scopes.read();
        slot(&scopes, &binding).map(|slot| slot.locked)
    }

    /// Whether a live session currently holds the binding
    pub fn is_substituted(&self, target: &str) -> Result<bool> {
        let binding = BindingRef::parse(target)?;
        let scopes = self.scopes.read();
        slot(&scopes, &binding).map(|slot| slot.held_by.is_some())
    }

    /// Number of bindings across all scopes
    pub fn len(&self) -> usize {
        self.scopes.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All bindings, ordered by scope then name
    pub fn bindings(&self) -> Vec<BindingInfo> {
        let scopes = self.scopes.read();
        let mut out = BTreeMap::new();

        for (scope_name, scope) in scopes.iter() {
            for (name, slot) in scope {
                let Ok(binding) = BindingRef::new(scope_name.clone(), name.clone()) else {
                    continue;
                };
                out.insert(
                    binding.clone(),
                    BindingInfo {
                        binding,
                        kind: slot.kind,
                        locked: slot.locked,
                        substituted: slot.held_by.is_some(),
                        signature: slot.value.signature(),
                    },
                );
            }
        }

        out.into_values().collect()
    }

    /// Human-readable binding table
    pub fn export_table(&self) -> String {
        let mut output = String::from("# Interpose binding table\n\n");

        for info in self.bindings() {
            output.push_str(&format!(
                "{} [{}{}{}] {}\n",
                info.binding,
                info.kind,
                if info.locked { ", locked" } else { "" },
                if info.substituted { ", substituted" } else { "" },
                info.signature
            ));
        }

        output
    }

    /// Validate and install a batch of substitutes under one write lock.
    ///
    /// Nothing is installed unless every entry resolves to an unheld
    /// closure binding.
    pub(crate) fn install_batch(
        &self,
        session: Ulid,
        batch: &[(BindingRef, FunctionValue)],
    ) -> Result<Vec<SavedBinding>> {
        let mut scopes = self.scopes.write();

        for (binding, _) in batch {
            let slot = slot(&scopes, binding)?;

            if slot.kind != BindingKind::Closure {
                return Err(MockError::UnsupportedBindingKind {
                    binding: binding.to_string(),
                    kind: slot.kind.to_string(),
                });
            }

            if let Some(holder) = slot.held_by {
                return Err(MockError::BindingInUse {
                    binding: binding.to_string(),
                    session: holder.to_string(),
                });
            }
        }

        let mut saved = Vec::with_capacity(batch.len());
        for (binding, substitute) in batch {
            let slot = slot_mut(&mut scopes, binding)?;

            saved.push(SavedBinding {
                binding: binding.clone(),
                original: std::mem::replace(&mut slot.value, substitute.clone()),
                was_locked: slot.locked,
            });
            slot.locked = false;
            slot.held_by = Some(session);

            debug!("Session {} installed substitute for {}", session, binding);
        }

        Ok(saved)
    }

    /// Reinstate originals taken by `install_batch`.
    ///
    /// Every binding is attempted; the ones that could not be reinstated are
    /// reported together.
    pub(crate) fn restore_batch(&self, session: Ulid, saved: Vec<SavedBinding>) -> Result<()> {
        let mut scopes = self.scopes.write();
        let mut failed = Vec::new();
        let mut reasons = Vec::new();

        for entry in saved.into_iter().rev() {
            match slot_mut(&mut scopes, &entry.binding) {
                Ok(slot) if slot.held_by == Some(session) => {
                    slot.value = entry.original;
                    slot.locked = entry.was_locked;
                    slot.held_by = None;
                    debug!("Session {} restored {}", session, entry.binding);
                }
                Ok(_) => {
                    reasons.push(format!("{} was taken over by another session", entry.binding));
                    failed.push(entry.binding.to_string());
                }
                Err(_) => {
                    reasons.push(format!("{} no longer exists", entry.binding));
                    failed.push(entry.binding.to_string());
                }
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

    /// Force a substitute into any binding, primitives included
    pub(crate) fn force_swap(&self, target: &str, substitute: FunctionValue) -> Result<SavedBinding> {
        let binding = BindingRef::parse(target)?;
        let mut scopes = self.scopes.write();
        let slot = slot_mut(&mut scopes, &binding)?;

        if let Some(holder) = slot.held_by {
            return Err(MockError::BindingInUse {
                binding: binding.to_string(),
                session: holder.to_string(),
            });
        }

        let was_locked = slot.locked;
        slot.locked = false;
        let original = std::mem::replace(&mut slot.value, substitute);

        Ok(SavedBinding {
            binding,
            original,
            was_locked,
        })
    }

    /// Undo a `force_swap`
    pub(crate) fn reinstate(&self, saved: SavedBinding) -> Result<()> {
        let mut scopes = self.scopes.write();
        let slot = slot_mut(&mut scopes, &saved.binding).map_err(|_| MockError::RestorationFailed {
            bindings: vec![saved.binding.to_string()],
            reason: format!("{} no longer exists", saved.binding),
        })?;

        slot.value = saved.original;
        slot.locked = saved.was_locked;
        Ok(())
    }

    fn set_locked(&self, target: &str, locked: bool) -> Result<()> {
        let binding = BindingRef::parse(target)?;
        let mut scopes = self.scopes.write();
        slot_mut(&mut scopes, &binding)?.locked = locked;
        debug!("{} binding {}", if locked { "Locked" } else { "Unlocked" }, binding);
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("bindings", &self.len()).finish()
    }
}

fn unresolvable(binding: &BindingRef) -> MockError {
    MockError::UnresolvableBinding {
        binding: binding.to_string(),
    }
}

/// A binding held by a live session keeps its slot until the session restores it
fn check_not_held(binding: &BindingRef, slot: &Slot) -> Result<()> {
    match slot.held_by {
        Some(holder) => Err(MockError::BindingInUse {
            binding: binding.to_string(),
            session: holder.to_string(),
        }),
        None => Ok(()),
    }
}

fn slot<'a>(scopes: &'a Scopes, binding: &BindingRef) -> Result<&'a Slot> {
    scopes
        .get(binding.scope())
        .and_then(|scope| scope.get(binding.name()))
        .ok_or_else(|| unresolvable(binding))
}

fn slot_mut<'a>(scopes: &'a mut Scopes, binding: &BindingRef) -> Result<&'a mut Slot> {
    scopes
        .get_mut(binding.scope())
        .and_then(|scope| scope.get_mut(binding.name()))
        .ok_or_else(|| unresolvable(binding))
}
