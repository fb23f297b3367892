//! Failure reporting.
//!
//! | Severity | Action |
//! |----------|--------|
//! | `None`   | nothing |
//! | `Warn`   | [`ReportSink::warn`] |
//! | `Error`  | [`ReportSink::error`] |
//! | `Throw`  | `Err`, built from the configured [`ErrorType`] if any |
//!
//! Severity and error type are taken from the resolver when it sets them,
//! otherwise from the deserializer defaults.

use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use crate::chain::{Failure, FailureKind};
use crate::error::{DeserializeError, Result};
use crate::resolver::Resolver;
use crate::types::Severity;

/// Destination for `Warn` and `Error` diagnostics.
pub trait ReportSink: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink: forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn warn(&self, message: &str) {
        warn!(target: "fieldmap", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "fieldmap", "{}", message);
    }
}

/// Constructor for the error raised at `Throw` severity.
///
/// ```ignore
/// #[derive(Debug, thiserror::Error)]
/// #[error("{0}")]
/// struct FooError(String);
///
/// let error_type = ErrorType::new(FooError);
/// ```
#[derive(Clone)]
pub struct ErrorType {
    name: &'static str,
    build: Arc<dyn Fn(String) -> Box<dyn std::error::Error + Send + Sync> + Send + Sync>,
}

impl ErrorType {
    pub fn new<E, F>(build: F) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(String) -> E + Send + Sync + 'static,
    {
        Self {
            name: std::any::type_name::<E>(),
            build: Arc::new(move |message| -> Box<dyn std::error::Error + Send + Sync> {
                Box::new(build(message))
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Construct the caller's error around a formatted message
    pub fn build(&self, message: String) -> DeserializeError {
        DeserializeError::Custom((self.build)(message))
    }
}

impl fmt::Debug for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErrorType({})", self.name)
    }
}

/// Engine-wide reporting defaults plus the sink they write to.
#[derive(Clone)]
pub struct Reporter {
    severity: Severity,
    error_type: Option<ErrorType>,
    sink: Arc<dyn ReportSink>,
}

impl Reporter {
    pub fn new(severity: Severity, error_type: Option<ErrorType>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            severity,
            error_type,
            sink,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn error_type(&self) -> Option<&ErrorType> {
        self.error_type.as_ref()
    }

    /// Report a resolver's failure, applying resolver-over-default precedence.
    pub fn notify(&self, failure: &Failure, resolver: &Resolver) -> Result<()> {
        let severity = resolver.severity().unwrap_or(self.severity);
        let error_type = resolver.error_type().or(self.error_type.as_ref());
        self.report(failure, severity, error_type)
    }

    /// Report with an explicit severity and error type.
    pub fn report(
        &self,
        failure: &Failure,
        severity: Severity,
        error_type: Option<&ErrorType>,
    ) -> Result<()> {
        if severity.is_fatal() {
            let message = failure.message();
            return Err(match (error_type, &failure.kind) {
                (Some(error_type), _) => error_type.build(message),
                (None, FailureKind::Unresolved) => DeserializeError::Unresolved(message),
                (None, FailureKind::Validation { .. }) => DeserializeError::Invalid(message),
            });
        }
        if !severity.is_logged() {
            return Ok(());
        }
        let message = failure.message();
        if severity == Severity::Error {
            self.sink.error(&message);
        } else {
            self.sink.warn(&message);
        }
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(Severity::default(), None, Arc::new(TracingSink))
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("severity", &self.severity)
            .field("error_type", &self.error_type)
            .finish_non_exhaustive()
    }
}
