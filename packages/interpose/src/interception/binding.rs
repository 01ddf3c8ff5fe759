// packages/interpose/src/interception/binding.rs
//! Binding references, binding kinds and type-erased function values

use crate::utils::errors::{MockError, Result};
use std::any::{type_name, Any};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies a function by its defining scope and its name in that scope
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingRef {
    scope: String,
    name: String,
}

impl BindingRef {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let scope = scope.into();
        let name = name.into();

        if scope.is_empty() || name.is_empty() || name.contains('.') {
            return Err(MockError::InvalidBindingRef(format!("{}.{}", scope, name)));
        }

        Ok(Self { scope, name })
    }

    /// Parse a dotted identifier. The last `.` splits scope from name, so
    /// `pkg.sub.fetch` resolves `fetch` in scope `pkg.sub`.
    pub fn parse(target: &str) -> Result<Self> {
        let (scope, name) = target
            .rsplit_once('.')
            .ok_or_else(|| MockError::InvalidBindingRef(target.to_string()))?;

        Self::new(scope, name).map_err(|_| MockError::InvalidBindingRef(target.to_string()))
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for BindingRef {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BindingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.name)
    }
}

/// How a binding may be rebound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Ordinary function value, rebindable by sessions
    Closure,

    /// Built-in whose implementation is not an ordinary rebindable value.
    /// Only the manual fallback may replace it.
    Primitive,
}

impl BindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::Closure => "closure",
            BindingKind::Primitive => "primitive",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) type DynFn<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);

/// A cheaply clonable, type-erased `Fn(A) -> R`.
///
/// Arguments travel as a single owned value: `()` for none, a tuple for
/// several. Clones share identity, so a value read back after a session can
/// be compared against the one read before it with [`FunctionValue::same_as`].
#[derive(Clone)]
pub struct FunctionValue {
    inner: Arc<dyn Any + Send + Sync>,
    signature: &'static str,
    id: u64,
}

impl FunctionValue {
    pub fn new<A, R, F>(f: F) -> Self
    where
        A: 'static,
        R: 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let erased: DynFn<A, R> = Arc::new(f);

        Self {
            inner: Arc::new(erased),
            signature: type_name::<fn(A) -> R>(),
            id: NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A function that returns a clone of `value` whatever it is given
    pub fn returning<A, R>(value: R) -> Self
    where
        A: 'static,
        R: Clone + Send + Sync + 'static,
    {
        Self::new(move |_: A| value.clone())
    }

    /// Invoke with the given argument and return types.
    ///
    /// A mismatch with the stored signature is reported here, not when the
    /// value was installed.
    pub fn call<A, R>(&self, args: A) -> Result<R>
    where
        A: 'static,
        R: 'static,
    {
        self.call_as("<anonymous>", args)
    }

    pub(crate) fn call_as<A, R>(&self, binding: &str, args: A) -> Result<R>
    where
        A: 'static,
        R: 'static,
    {
        let f = self.downcast::<A, R>().ok_or_else(|| MockError::SignatureMismatch {
            binding: binding.to_string(),
            expected: self.signature,
            found: type_name::<fn(A) -> R>(),
        })?;

        Ok(f(args))
    }

    /// The underlying closure, if it has this signature
    pub(crate) fn typed<A: 'static, R: 'static>(&self) -> Option<DynFn<A, R>> {
        self.downcast::<A, R>().cloned()
    }

    /// Whether this value can be called as `Fn(A) -> R`
    pub fn accepts<A: 'static, R: 'static>(&self) -> bool {
        self.downcast::<A, R>().is_some()
    }

    /// Whether both handles refer to the same function value
    pub fn same_as(&self, other: &FunctionValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn signature(&self) -> &'static str {
        self.signature
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn downcast<A: 'static, R: 'static>(&self) -> Option<&DynFn<A, R>> {
        self.inner.downcast_ref::<DynFn<A, R>>()
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .finish()
    }
}
