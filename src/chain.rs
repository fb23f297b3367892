//! Per-resolver step execution.
//!
//! The chain threads one extracted value through a resolver's steps. The
//! first failing step trips the breaker: the fallback is resolved, nothing
//! after that step runs, and a single [`Failure`] describes what happened.

use std::fmt;

use anyhow::anyhow;
use serde_json::Value;
use tracing::trace;

use crate::path::describe;
use crate::resolver::{Fallback, Step};

/// Which kind of step broke the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// An operator raised or resolved to undefined
    Unresolved,
    /// A validator returned false or raised
    Validation { validator: String, index: usize },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => f.write_str("unresolved value"),
            Self::Validation { .. } => f.write_str("invalid value"),
        }
    }
}

/// The one failure a resolver can produce per call.
#[derive(Debug)]
pub struct Failure {
    pub kind: FailureKind,
    pub source_path: String,
    /// Rendering of the value extracted from the source, before any step ran
    pub from_value: String,
    /// The fallback actually substituted
    pub fallback: Option<Value>,
    pub cause: anyhow::Error,
}

impl Failure {
    /// Diagnostic line used by every reporter channel.
    pub fn message(&self) -> String {
        let fallback = describe(self.fallback.as_ref());
        match &self.kind {
            FailureKind::Unresolved => format!(
                "Unresolved value: {} was {} but failed deserialization, returned fallback value: {}. {:#}",
                self.source_path, self.from_value, fallback, self.cause
            ),
            FailureKind::Validation { validator, .. } => format!(
                "Invalid value: {} was {} and did not pass validation ({}), returned fallback value: {}. {:#}",
                self.source_path, self.from_value, validator, fallback, self.cause
            ),
        }
    }
}

/// Result of running one resolver's chain
#[derive(Debug)]
pub struct ChainOutcome {
    pub value: Option<Value>,
    pub failure: Option<Failure>,
}

/// Run `steps` over `initial`, substituting `fallback` on the first failure.
pub fn run(
    source_path: &str,
    initial: Option<Value>,
    steps: &[Step],
    fallback: &Fallback,
) -> ChainOutcome {
    let from_value = describe(initial.as_ref());

    let result = steps
        .iter()
        .enumerate()
        .try_fold(initial, |value, (index, step)| {
            apply(source_path, value, index, step)
        });

    match result {
        Ok(value) => ChainOutcome {
            value,
            failure: None,
        },
        Err((kind, cause)) => {
            let value = fallback.resolve();
            ChainOutcome {
                failure: Some(Failure {
                    kind,
                    source_path: source_path.to_string(),
                    from_value,
                    fallback: value.clone(),
                    cause,
                }),
                value,
            }
        }
    }
}

fn apply(
    source_path: &str,
    value: Option<Value>,
    index: usize,
    step: &Step,
) -> Result<Option<Value>, (FailureKind, anyhow::Error)> {
    trace!(path = source_path, step = step.name(), index, "applying step");
    match step {
        Step::Operator { name, func } => match func(value) {
            Ok(Some(next)) => Ok(Some(next)),
            Ok(None) => Err((
                FailureKind::Unresolved,
                anyhow!(
                    "Property \"{}\" resolved to undefined in step `{}`",
                    source_path,
                    name
                ),
            )),
            Err(cause) => Err((FailureKind::Unresolved, cause)),
        },
        Step::Validator { name, func } => {
            let kind = FailureKind::Validation {
                validator: name.to_string(),
                index,
            };
            match func(value.as_ref()) {
                Ok(true) => Ok(value),
                Ok(false) => Err((
                    kind,
                    anyhow!(
                        "Property \"{}\" resolved to a value that did not pass validation",
                        source_path
                    ),
                )),
                Err(cause) => Err((kind, cause)),
            }
        }
    }
}
