//! Remote execution backends.
//!
//! A backend is a remote HTTP service that compiles and runs a snippet.
//! Two providers are supported, each with its own wire schema:
//!
//! - [`piston::PistonBackend`]: `POST {url}/execute`, catalog at
//!   `GET {url}/runtimes`.
//! - [`wandbox::WandboxBackend`]: `POST {url}` with a per-language
//!   compiler id from the configured catalog.
//!
//! Logical failures (the user's code did not compile or exited non-zero,
//! or the language has no compiler mapping) are `Ok(ExecutionResult)` with
//! the failure encoded in the result. `Err(TransportError)` is reserved
//! for infrastructure faults: connection, HTTP status, timeout, body
//! parse. The pipeline caches the former and only logs the latter.

pub mod piston;
pub mod registry;
pub mod wandbox;

use async_trait::async_trait;
use thiserror::Error;

/// A single execution submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub source: String,
    pub lang: String,
    pub stdin: Option<String>,
    pub args: Option<Vec<String>>,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            lang: lang.into(),
            stdin: None,
            args: None,
        }
    }
}

/// What came back from the executor, normalized across providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_error: Option<String>,
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Exit code zero and no error output of any kind.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
            && self.stderr.as_deref().unwrap_or("").is_empty()
            && self.compile_error.as_deref().unwrap_or("").is_empty()
    }

    /// The logical failure returned when the catalog has no compiler for
    /// the requested language. Not a transport fault: it is cached and
    /// replayable like any other result.
    pub fn unsupported_language(lang: &str) -> Self {
        Self {
            compile_error: Some(format!("unsupported language: {lang}")),
            exit_code: 1,
            ..Self::default()
        }
    }

    /// The logical failure for a snippet that could not be preprocessed.
    pub fn preprocessing_failure(reason: impl Into<String>) -> Self {
        Self {
            compile_error: Some(reason.into()),
            exit_code: 1,
            ..Self::default()
        }
    }
}

/// Infrastructure faults talking to an execution provider.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("malformed response body from {url}: {reason}")]
    MalformedBody { url: String, reason: String },
}

impl TransportError {
    /// Fold a `reqwest` error into the taxonomy; timeouts get their own
    /// variant.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Capability set every execution provider implements.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Registry name of this backend (e.g. `"piston"`).
    fn name(&self) -> &str;

    /// Submit one snippet and wait for the outcome.
    async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionResult, TransportError>;

    /// Re-fetch the language/compiler catalog from the provider, replacing
    /// the current one wholesale. Providers without a remote catalog treat
    /// this as a no-op. Idempotent.
    async fn refresh_catalog(&self) -> Result<(), TransportError>;

    /// Whether the current catalog maps the given language tag.
    fn supports(&self, lang: &str) -> bool;
}
