// packages/interpose/src/recording/call_log.rs
//! Call log for substitutes
//!
//! Wraps a substitute (or a real function, to observe it) so every call's
//! argument and result are kept for assertions after the block has run.

use crate::interception::binding::FunctionValue;
use crate::utils::errors::{MockError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::any::type_name;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// One observed call
#[derive(Debug, Clone)]
pub struct RecordedCall<A, R> {
    pub args: A,
    pub result: R,
    pub at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Shared log of calls made through the functions it wraps
#[derive(Debug)]
pub struct CallLog<A, R> {
    calls: Arc<Mutex<Vec<RecordedCall<A, R>>>>,
}

impl<A, R> Clone for CallLog<A, R> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<A, R> Default for CallLog<A, R> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<A, R> CallLog<A, R>
where
    A: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `f` into a function value that logs each call
    pub fn record<F>(&self, f: F) -> FunctionValue
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let calls = Arc::clone(&self.calls);

        FunctionValue::new(move |args: A| {
            let start = Instant::now();
            let result = f(args.clone());

            calls.lock().push(RecordedCall {
                args,
                result: result.clone(),
                at: Utc::now(),
                elapsed: start.elapsed(),
            });
            result
        })
    }

    /// Wrap an existing function value, passing calls through to it
    pub fn spy(&self, original: &FunctionValue) -> Result<FunctionValue> {
        let inner = original
            .typed::<A, R>()
            .ok_or_else(|| MockError::SignatureMismatch {
                binding: "<spied>".to_string(),
                expected: original.signature(),
                found: type_name::<fn(A) -> R>(),
            })?;

        debug!("Spying on function value {}", original.id());
        Ok(self.record(move |args| inner(args)))
    }

    pub fn calls(&self) -> Vec<RecordedCall<A, R>> {
        self.calls.lock().clone()
    }

    /// Arguments of every call, oldest first
    pub fn args(&self) -> Vec<A> {
        self.calls.lock().iter().map(|call| call.args.clone()).collect()
    }

    pub fn last_args(&self) -> Option<A> {
        self.calls.lock().last().map(|call| call.args.clone())
    }

    pub fn last_result(&self) -> Option<R> {
        self.calls.lock().last().map(|call| call.result.clone())
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Total time spent inside logged calls
    pub fn total_elapsed(&self) -> Duration {
        self.calls.lock().iter().map(|call| call.elapsed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::{Registry, Substitutions};

    #[test]
    fn test_record_calls() {
        let log: CallLog<String, usize> = CallLog::new();
        let value = log.record(|s: String| s.len());

        assert_eq!(value.call::<String, usize>("abc".to_string()).unwrap(), 3);
        assert_eq!(value.call::<String, usize>("hello".to_string()).unwrap(), 5);

        assert_eq!(log.len(), 2);
        assert_eq!(log.args(), vec!["abc".to_string(), "hello".to_string()]);
        assert_eq!(log.last_result(), Some(5));
    }

    #[test]
    fn test_spy_passes_through() {
        let registry = Registry::new();
        registry.define_fn("text.upper", |s: String| s.to_uppercase()).unwrap();

        let log: CallLog<String, String> = CallLog::new();
        let spied = log.spy(&registry.lookup("text.upper").unwrap()).unwrap();

        let out = registry
            .with_mock(Substitutions::new().with("text.upper", spied), || {
                registry
                    .call::<String, String>("text.upper", "quiet".to_string())
                    .unwrap()
            })
            .unwrap();

        assert_eq!(out, "QUIET");
        assert_eq!(log.last_args().as_deref(), Some("quiet"));
        assert_eq!(log.last_result().as_deref(), Some("QUIET"));
    }

    #[test]
    fn test_spy_rejects_wrong_signature() {
        let log: CallLog<String, String> = CallLog::new();
        let original = FunctionValue::new(|x: u8| x);

        assert!(matches!(
            log.spy(&original),
            Err(MockError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let log: CallLog<(), bool> = CallLog::new();
        let value = log.record(|_: ()| true);
        value.call::<(), bool>(()).unwrap();

        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }
}
