// packages/interpose/src/utils/errors.rs
//! Error types for the interception facility and its collaborators

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MockError>;

/// Errors raised by the interception facility and the bundled collaborators
#[derive(Debug, Error)]
pub enum MockError {
    /// The identifier is not of the form `scope.name`
    #[error("invalid binding reference `{0}`: expected `scope.name`")]
    InvalidBindingRef(String),

    /// No binding with this name exists in the scope
    #[error("cannot resolve binding `{binding}`")]
    UnresolvableBinding { binding: String },

    /// The binding exists but cannot be rebound through the standard path
    #[error("binding `{binding}` is a {kind} function and cannot be substituted; use manual_substitute or a wrapper")]
    UnsupportedBindingKind { binding: String, kind: String },

    /// Another live session already holds this binding
    #[error("binding `{binding}` is already substituted by session {session}")]
    BindingInUse { binding: String, session: String },

    /// Assignment to a locked binding
    #[error("cannot change value of locked binding `{binding}`")]
    LockedBinding { binding: String },

    /// The function value was called with the wrong argument or return type
    #[error("signature mismatch for `{binding}`: value is {expected}, called as {found}")]
    SignatureMismatch {
        binding: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Originals could not be reinstated; shared bindings are left substituted
    #[error("failed to restore {bindings:?}: {reason}")]
    RestorationFailed { bindings: Vec<String>, reason: String },

    #[error("process failed: {0}")]
    ProcessFailed(String),

    /// The response carried a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("transport failed: {0}")]
    TransportFailed(String),

    #[error("fixture error: {0}")]
    FixtureError(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("export failed: {0}")]
    ExportFailed(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl MockError {
    /// Whether this error was raised before any binding was touched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MockError::InvalidBindingRef(_)
                | MockError::UnresolvableBinding { .. }
                | MockError::UnsupportedBindingKind { .. }
                | MockError::BindingInUse { .. }
        )
    }
}

impl From<::config::ConfigError> for MockError {
    fn from(e: ::config::ConfigError) -> Self {
        MockError::ConfigError(e.to_string())
    }
}
