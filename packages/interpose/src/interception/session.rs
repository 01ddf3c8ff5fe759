// packages/interpose/src/interception/session.rs
//! Interception sessions
//!
//! A session captures the original value of every requested binding,
//! installs the substitutes, and reinstates the originals exactly once when
//! it ends. The end is tied to the session's scope: `finish` on the normal
//! path, `Drop` on every other path (early return, `?`, panic unwinding).
//!
//! Bindings are process-wide state. Sessions are serialised through a
//! re-entrant gate, so a session on another thread waits until the current
//! one ends, while a session nested on the same thread proceeds. Nested
//! sessions must not overlap: a binding held by a live session is rejected
//! with [`MockError::BindingInUse`].

use crate::interception::binding::{BindingRef, FunctionValue};
use crate::interception::registry::{Registry, SavedBinding};
use crate::utils::errors::{MockError, Result};
use once_cell::sync::Lazy;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use ulid::Ulid;

static SESSION_GATE: Lazy<ReentrantMutex<()>> = Lazy::new(|| ReentrantMutex::new(()));

/// Held while a thread works with substituted bindings
pub type SessionGate = ReentrantMutexGuard<'static, ()>;

/// Acquire the process-wide session gate.
///
/// Tests that read shared bindings without substituting them hold this so
/// they never observe another test's substitutes.
pub fn exclusive() -> SessionGate {
    SESSION_GATE.lock()
}

/// Requested substitutions, keyed by `scope.name`
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    entries: Vec<(String, FunctionValue)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitute `target` with an already-built function value
    pub fn with(mut self, target: impl Into<String>, value: FunctionValue) -> Self {
        let target = target.into();
        self.entries.retain(|(existing, _)| *existing != target);
        self.entries.push((target, value));
        self
    }

    /// Substitute `target` with a closure
    pub fn replace<A, R, F>(self, target: impl Into<String>, f: F) -> Self
    where
        A: 'static,
        R: 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.with(target, FunctionValue::new(f))
    }

    /// Substitute `target` with a function returning a fixed value
    pub fn returning<A, R>(self, target: impl Into<String>, value: R) -> Self
    where
        A: 'static,
        R: Clone + Send + Sync + 'static,
    {
        self.with(target, FunctionValue::returning::<A, R>(value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(target, _)| target.as_str())
    }

    fn resolve(self) -> Result<Vec<(BindingRef, FunctionValue)>> {
        self.entries
            .into_iter()
            .map(|(target, value)| -> Result<(BindingRef, FunctionValue)> {
                Ok((BindingRef::parse(&target)?, value))
            })
            .collect()
    }
}

/// Live substitution of one or more bindings
pub struct InterceptionSession<'r> {
    id: Ulid,
    registry: &'r Registry,
    saved: Option<Vec<SavedBinding>>,
    started: Instant,
    _gate: SessionGate,
}

impl<'r> InterceptionSession<'r> {
    /// Validate and install every substitution, or none of them.
    ///
    /// The session holds the session gate until it ends, so a session
    /// begun on another thread waits for this one to restore.
    pub fn begin(registry: &'r Registry, substitutions: Substitutions) -> Result<Self> {
        let gate = exclusive();
        let id = Ulid::new();
        let batch = substitutions.resolve().map_err(|e| reject(id, e))?;

        let saved = registry.install_batch(id, &batch).map_err(|e| reject(id, e))?;

        metrics::counter!("interpose_sessions_total").increment(1);
        info!("Session {} started with {} substitution(s)", id, saved.len());

        Ok(Self {
            id,
            registry,
            saved: Some(saved),
            started: Instant::now(),
            _gate: gate,
        })
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Bindings currently substituted by this session
    pub fn bindings(&self) -> Vec<String> {
        self.saved
            .iter()
            .flatten()
            .map(|saved| saved.binding.to_string())
            .collect()
    }

    /// Original value of a binding held by this session
    pub fn original(&self, target: &str) -> Option<FunctionValue> {
        self.saved
            .iter()
            .flatten()
            .find(|saved| saved.binding.to_string() == target)
            .map(|saved| saved.original.clone())
    }

    /// Restore every original and end the session
    pub fn finish(mut self) -> Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };

        let result = self.registry.restore_batch(self.id, saved);
        match &result {
            Ok(()) => info!("Session {} restored after {:?}", self.id, self.started.elapsed()),
            Err(e) => {
                metrics::counter!("interpose_restore_failures_total").increment(1);
                error!("Session {} left shared bindings substituted: {}", self.id, e);
            }
        }
        result
    }
}

impl Drop for InterceptionSession<'_> {
    fn drop(&mut self) {
        if self.saved.is_none() {
            return;
        }

        if std::thread::panicking() {
            debug!("Session {} restoring during unwind", self.id);
        }

        if let Err(e) = self.restore() {
            if !std::thread::panicking() {
                panic!("interception session {} could not restore bindings: {}", self.id, e);
            }
        }
    }
}

impl std::fmt::Debug for InterceptionSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionSession")
            .field("id", &self.id)
            .field("bindings", &self.bindings())
            .finish()
    }
}

/// Run `block` once with `substitutions` installed, restoring afterwards.
///
/// Validation errors are returned before anything is installed. A panic in
/// `block` propagates to the caller after the originals are back in place.
/// A block that returns a `Result` has its error handed back untouched
/// inside `Ok`.
pub fn run_with_substitutions<T>(
    registry: &Registry,
    substitutions: Substitutions,
    block: impl FnOnce() -> T,
) -> Result<T> {
    let session = InterceptionSession::begin(registry, substitutions)?;

    let value = block();

    session.finish()?;
    Ok(value)
}

impl Registry {
    /// Shorthand for [`run_with_substitutions`] on this registry
    pub fn with_mock<T>(&self, substitutions: Substitutions, block: impl FnOnce() -> T) -> Result<T> {
        run_with_substitutions(self, substitutions, block)
    }
}

fn reject(id: Ulid, e: MockError) -> MockError {
    metrics::counter!("interpose_sessions_rejected_total").increment(1);
    warn!("Session {} rejected before installing anything: {}", id, e);
    e
}
