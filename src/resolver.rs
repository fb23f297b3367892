//! Resolver descriptors and the fluent builder that produces them.
//!
//! A [`Resolver`] maps one source path to one target path through an ordered
//! list of [`Step`]s, with a [`Fallback`] substituted on any failure. The only
//! way to obtain one is a terminal `fallback*` call on [`ResolverBuilder`],
//! which consumes the builder, so a partially-built resolver can never be
//! installed and a finished one is never mutated.
//!
//! ```ignore
//! use fieldmap::resolve;
//! use serde_json::json;
//!
//! let resolver = resolve("a.b")
//!     .to("val")
//!     .map(|v| v.and_then(|v| v.as_str()?.parse::<i64>().ok()).map(Into::into))
//!     .validate_number()
//!     .fallback(json!(0));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use anyhow::bail;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::deserializer::Deserializable;
use crate::error::Result;
use crate::path::{kind_name, validate_path};
use crate::reporter::ErrorType;
use crate::steps;
use crate::types::Severity;

/// Operator: transforms the current value. `Ok(None)` means "resolved to undefined".
pub type OperatorFn = Arc<dyn Fn(Option<Value>) -> anyhow::Result<Option<Value>> + Send + Sync>;

/// Validator: checks the current value without changing it.
pub type ValidatorFn = Arc<dyn Fn(Option<&Value>) -> anyhow::Result<bool> + Send + Sync>;

/// One entry in a resolver's chain.
#[derive(Clone)]
pub enum Step {
    Operator {
        name: Cow<'static, str>,
        func: OperatorFn,
    },
    Validator {
        name: Cow<'static, str>,
        func: ValidatorFn,
    },
}

impl Step {
    /// Build an operator step
    pub fn operator<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(Option<Value>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self::Operator {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Build a validator step
    pub fn validator<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(Option<&Value>) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self::Validator {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Operator { name, .. } | Self::Validator { name, .. } => name,
        }
    }

    pub fn is_validator(&self) -> bool {
        matches!(self, Self::Validator { .. })
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator { name, .. } => write!(f, "Operator({})", name),
            Self::Validator { name, .. } => write!(f, "Validator({})", name),
        }
    }
}

/// Value substituted when a resolver's chain fails.
#[derive(Clone, Default)]
pub enum Fallback {
    /// Leave the target field undefined
    #[default]
    Undefined,
    Value(Value),
    /// Invoked fresh on every failure, never cached. `None` leaves the
    /// target field undefined for that failure.
    Producer(Arc<dyn Fn() -> Option<Value> + Send + Sync>),
}

impl Fallback {
    /// Produce the fallback value for one failure.
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Self::Undefined => None,
            Self::Value(value) => Some(value.clone()),
            Self::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Value(value) => write!(f, "Value({})", value),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Immutable mapping from one source field to one target field.
#[derive(Clone, Debug)]
pub struct Resolver {
    source_path: String,
    target_path: String,
    steps: Vec<Step>,
    fallback: Fallback,
    severity: Option<Severity>,
    error_type: Option<ErrorType>,
}

impl Resolver {
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn fallback(&self) -> &Fallback {
        &self.fallback
    }

    /// Per-resolver severity, overriding the deserializer default
    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    /// Per-resolver error type, overriding the deserializer default
    pub fn error_type(&self) -> Option<&ErrorType> {
        self.error_type.as_ref()
    }

    /// Check both paths are usable.
    pub fn validate(&self) -> Result<()> {
        validate_path(&self.source_path)?;
        validate_path(&self.target_path)
    }
}

/// Start a resolver for the given source path.
pub fn resolve(path: impl Into<String>) -> ResolverBuilder {
    ResolverBuilder::new(path)
}

/// Accumulates steps for one resolver; finalized by `fallback`,
/// `fallback_with`, `fallback_optional_with` or `fallback_undefined`.
#[must_use = "a resolver is only produced by one of the fallback methods"]
#[derive(Debug)]
pub struct ResolverBuilder {
    source_path: String,
    target_path: Option<String>,
    steps: Vec<Step>,
    severity: Option<Severity>,
    error_type: Option<ErrorType>,
}

impl ResolverBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            source_path: path.into(),
            target_path: None,
            steps: Vec::new(),
            severity: None,
            error_type: None,
        }
    }

    /// Write to a different target path than the source path.
    pub fn to(mut self, path: impl Into<String>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    /// Append a prebuilt step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Transform the current value. Returning `None` fails the resolver.
    pub fn map<F>(self, func: F) -> Self
    where
        F: Fn(Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.step(Step::operator("map", move |value| Ok(func(value))))
    }

    /// Fallible transform; an `Err` fails the resolver with that cause.
    pub fn try_map<F>(self, func: F) -> Self
    where
        F: Fn(Option<Value>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        self.step(Step::operator("try_map", func))
    }

    /// Observe the current value. The value passes through unchanged, so a
    /// missing value still fails the resolver here.
    pub fn tap<F>(self, func: F) -> Self
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        self.step(Step::operator("tap", move |value: Option<Value>| {
            func(value.as_ref());
            Ok(value)
        }))
    }

    /// Deserialize the current value into a fresh `T`.
    pub fn deserialize_to<T>(self) -> Self
    where
        T: Deserializable + Default + Serialize + 'static,
    {
        let name = format!("deserialize_to<{}>", short_type_name::<T>());
        self.step(Step::operator(name, |value: Option<Value>| {
            // An undefined record behaves like one with every field missing.
            let source = value.unwrap_or_else(|| Value::Object(Map::new()));
            let record = T::default().deserialize(&source)?;
            Ok(Some(serde_json::to_value(record)?))
        }))
    }

    /// Deserialize every element of the current array into a fresh `T`.
    pub fn deserialize_to_array_of<T>(self) -> Self
    where
        T: Deserializable + Default + Serialize + 'static,
    {
        let name = format!("deserialize_to_array_of<{}>", short_type_name::<T>());
        self.step(Step::operator(name, |value: Option<Value>| {
            let items = match value {
                Some(Value::Array(items)) => items,
                Some(other) => bail!("expected an array, found {}", kind_name(&other)),
                None => bail!("expected an array, found undefined"),
            };
            let records = items
                .iter()
                .map(|item| {
                    let record = T::default().deserialize(item)?;
                    Ok(serde_json::to_value(record)?)
                })
                .collect::<anyhow::Result<Vec<Value>>>()?;
            Ok(Some(Value::Array(records)))
        }))
    }

    /// Fail the resolver when the predicate returns false.
    pub fn validate<F>(self, func: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.step(Step::validator("validate", move |value| Ok(func(value))))
    }

    /// Fallible predicate; an `Err` counts as a failed validation.
    pub fn try_validate<F>(self, func: F) -> Self
    where
        F: Fn(Option<&Value>) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.step(Step::validator("try_validate", func))
    }

    pub fn validate_string(self) -> Self {
        self.step(steps::validate_string())
    }

    pub fn validate_number(self) -> Self {
        self.step(steps::validate_number())
    }

    pub fn validate_boolean(self) -> Self {
        self.step(steps::validate_boolean())
    }

    pub fn validate_array(self) -> Self {
        self.step(steps::validate_array())
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = Some(error_type);
        self
    }

    /// Finish with a constant fallback.
    pub fn fallback(self, value: impl Into<Value>) -> Resolver {
        self.finish(Fallback::Value(value.into()))
    }

    /// Finish with a fallback producer, called once per failure.
    pub fn fallback_with<F>(self, produce: F) -> Resolver
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.finish(Fallback::Producer(Arc::new(move || Some(produce()))))
    }

    /// Finish with a producer that may decide, per failure, to leave the
    /// target field undefined.
    pub fn fallback_optional_with<F>(self, produce: F) -> Resolver
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        self.finish(Fallback::Producer(Arc::new(produce)))
    }

    /// Finish with no fallback; failures leave the target field undefined.
    pub fn fallback_undefined(self) -> Resolver {
        self.finish(Fallback::Undefined)
    }

    fn finish(mut self, fallback: Fallback) -> Resolver {
        // A bare resolver still has to catch a missing source value.
        if self.steps.is_empty() {
            self.steps.push(steps::identity());
        }
        let target_path = self
            .target_path
            .unwrap_or_else(|| self.source_path.clone());
        Resolver {
            source_path: self.source_path,
            target_path,
            steps: self.steps,
            fallback,
            severity: self.severity,
            error_type: self.error_type,
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
