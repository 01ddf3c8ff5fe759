// packages/interpose/src/runtime/docs.rs
//! Opening documentation in a browser
//!
//! Only interactive sessions launch a browser; everywhere else the URL is
//! handed back for printing. The check goes through the `docs.is_interactive`
//! wrapper rather than the `base.interactive` primitive, so tests can mock it
//! with an ordinary session.

use crate::interception::registry::Registry;
use crate::runtime::builtins::{BROWSE_URL, IS_INTERACTIVE};
use crate::utils::errors::{MockError, Result};
use std::process::Command;
use tracing::{debug, info};

/// What `open_docs` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocsOutcome {
    /// A browser was asked to open the URL
    Opened(String),

    /// Not interactive; the caller should print the URL
    Printed(String),
}

pub fn open_docs(registry: &Registry, url: &str) -> Result<DocsOutcome> {
    let interactive: Result<bool> = registry.call(IS_INTERACTIVE, ())?;
    let interactive = interactive?;

    if !interactive {
        debug!("Not interactive, not launching a browser for {}", url);
        return Ok(DocsOutcome::Printed(url.to_string()));
    }

    let launched: Result<()> = registry.call(BROWSE_URL, url.to_string())?;
    launched?;

    info!("Opened {} in browser", url);
    Ok(DocsOutcome::Opened(url.to_string()))
}

/// Hand `url` to the platform's opener
pub fn browse_url(url: &str) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer"
    } else {
        "xdg-open"
    };

    let status = Command::new(opener).arg(url).status()?;
    if !status.success() {
        return Err(MockError::ProcessFailed(format!(
            "{} exited with {} for {}",
            opener, status, url
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::{DeferScope, FunctionValue, Substitutions};
    use crate::runtime::builtins::INTERACTIVE;
    use parking_lot::Mutex;
    use std::sync::Arc;

    const URL: &str = "https://example.org/docs";

    fn browse_log() -> (Arc<Mutex<Vec<String>>>, Substitutions) {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&opened);
        let subs = Substitutions::new().replace(BROWSE_URL, move |url: String| -> Result<()> {
            sink.lock().push(url);
            Ok(())
        });
        (opened, subs)
    }

    fn answering(subs: Substitutions, interactive: bool) -> Substitutions {
        subs.replace(IS_INTERACTIVE, move |_: ()| -> Result<bool> { Ok(interactive) })
    }

    #[test]
    fn test_opens_when_interactive() {
        let registry = Registry::with_builtins();
        let (opened, subs) = browse_log();

        let outcome = registry
            .with_mock(answering(subs, true), || {
                open_docs(&registry, URL)
            })
            .unwrap()
            .unwrap();

        assert_eq!(outcome, DocsOutcome::Opened(URL.to_string()));
        assert_eq!(*opened.lock(), vec![URL.to_string()]);
    }

    #[test]
    fn test_prints_when_not_interactive() {
        let registry = Registry::with_builtins();
        let (opened, subs) = browse_log();

        let outcome = registry
            .with_mock(answering(subs, false), || {
                open_docs(&registry, URL)
            })
            .unwrap()
            .unwrap();

        assert_eq!(outcome, DocsOutcome::Printed(URL.to_string()));
        assert!(opened.lock().is_empty());
    }

    #[test]
    fn test_primitive_cannot_be_mocked_directly() {
        let registry = Registry::with_builtins();
        let (opened, subs) = browse_log();
        let before = registry.lookup(BROWSE_URL).unwrap();

        let err = registry
            .with_mock(subs.returning::<(), bool>(INTERACTIVE, true), || {
                open_docs(&registry, URL)
            })
            .unwrap_err();

        assert!(matches!(err, MockError::UnsupportedBindingKind { .. }));
        assert!(registry.lookup(BROWSE_URL).unwrap().same_as(&before));
        assert!(opened.lock().is_empty());
    }

    #[test]
    fn test_forced_primitive_reaches_wrapper() {
        let registry = Registry::with_builtins();
        let (opened, subs) = browse_log();
        let mut scope = DeferScope::new("force interactive");

        registry
            .substitute_until(INTERACTIVE, FunctionValue::returning::<(), bool>(true), &mut scope)
            .unwrap();

        let outcome = registry.with_mock(subs, || open_docs(&registry, URL)).unwrap().unwrap();

        assert_eq!(outcome, DocsOutcome::Opened(URL.to_string()));
        assert_eq!(opened.lock().len(), 1);
    }

    #[test]
    fn test_browser_failure_propagates() {
        let registry = Registry::with_builtins();

        let err = registry
            .with_mock(
                answering(Substitutions::new(), true)
                    .replace(BROWSE_URL, |_: String| -> Result<()> {
                        Err(MockError::ProcessFailed("no display".to_string()))
                    }),
                || open_docs(&registry, URL),
            )
            .unwrap()
            .unwrap_err();

        assert!(err.to_string().contains("no display"));
    }

    #[test]
    fn test_mismatched_primitive_is_not_silently_false() {
        let registry = Registry::with_builtins();
        let (opened, subs) = browse_log();
        let mut scope = DeferScope::new("mismatched primitive");

        registry
            .substitute_until(INTERACTIVE, FunctionValue::returning::<(), i32>(1), &mut scope)
            .unwrap();

        let err = registry
            .with_mock(subs, || open_docs(&registry, URL))
            .unwrap()
            .unwrap_err();

        assert!(matches!(err, MockError::SignatureMismatch { .. }));
        assert!(opened.lock().is_empty());
    }
}
