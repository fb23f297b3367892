//! The resolution engine.
//!
//! A [`Deserializer`] owns a snapshot of resolvers and a [`Reporter`]. Each
//! `deserialize` call walks the resolvers in order:
//!
//! 1. extract the source value with [`get_path`]
//! 2. run the resolver's chain ([`chain::run`])
//! 3. report a failure, which may abort the call at `Throw` severity
//! 4. assign the result with [`set_path`]
//!
//! Assignments made before an abort are kept; there is no rollback.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::chain;
use crate::error::Result;
use crate::path::{get_path, set_path};
use crate::reporter::{ErrorType, ReportSink, Reporter, TracingSink};
use crate::resolver::Resolver;
use crate::types::Severity;

/// Types that know how to populate themselves from a source record.
///
/// This is what `deserialize_to` and `deserialize_to_array_of` delegate to,
/// so nested records compose without any special casing in the engine.
pub trait Deserializable: Sized {
    fn deserialize(self, source: &Value) -> Result<Self>;
}

/// Construction-time settings for a [`Deserializer`]
#[derive(Clone)]
pub struct DeserializerConfig {
    pub severity: Severity,
    pub error_type: Option<ErrorType>,
    pub resolvers: Vec<Resolver>,
    /// Where `Warn`/`Error` diagnostics go; `tracing` when unset
    pub sink: Option<Arc<dyn ReportSink>>,
}

impl DeserializerConfig {
    pub fn new(resolvers: Vec<Resolver>) -> Self {
        Self {
            resolvers,
            ..Self::default()
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = Some(error_type);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Default for DeserializerConfig {
    fn default() -> Self {
        Self {
            severity: Severity::Warn,
            error_type: None,
            resolvers: Vec::new(),
            sink: None,
        }
    }
}

impl fmt::Debug for DeserializerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializerConfig")
            .field("severity", &self.severity)
            .field("error_type", &self.error_type)
            .field("resolvers", &self.resolvers)
            .field("sink", &self.sink.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Maps source records onto targets through a list of resolvers.
#[derive(Clone, Debug)]
pub struct Deserializer {
    resolvers: Arc<[Resolver]>,
    reporter: Reporter,
}

impl Deserializer {
    /// Build a deserializer, rejecting resolvers with unusable paths.
    pub fn new(config: DeserializerConfig) -> Result<Self> {
        validate_all(&config.resolvers)?;
        let sink = config.sink.unwrap_or_else(|| Arc::new(TracingSink));
        Ok(Self {
            resolvers: config.resolvers.into(),
            reporter: Reporter::new(config.severity, config.error_type, sink),
        })
    }

    /// Current resolver list. Later `add_*`/`set_*` calls never change a
    /// snapshot that has already been handed out.
    pub fn resolvers(&self) -> Arc<[Resolver]> {
        Arc::clone(&self.resolvers)
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn add_resolver(&mut self, resolver: Resolver) -> Result<()> {
        self.add_resolvers(std::iter::once(resolver))
    }

    pub fn add_resolvers(&mut self, resolvers: impl IntoIterator<Item = Resolver>) -> Result<()> {
        let added: Vec<Resolver> = resolvers.into_iter().collect();
        validate_all(&added)?;
        self.resolvers = self.resolvers.iter().cloned().chain(added).collect();
        Ok(())
    }

    pub fn set_resolvers(&mut self, resolvers: impl IntoIterator<Item = Resolver>) -> Result<()> {
        let replaced: Vec<Resolver> = resolvers.into_iter().collect();
        validate_all(&replaced)?;
        self.resolvers = replaced.into();
        Ok(())
    }

    /// Resolve every field of `source` into `target` and hand `target` back.
    ///
    /// A `null` target is promoted to an empty object. At `Throw` severity
    /// the first failure aborts the call and fields from later resolvers are
    /// left untouched.
    pub fn deserialize<'t>(&self, source: &Value, target: &'t mut Value) -> Result<&'t mut Value> {
        if target.is_null() {
            *target = Value::Object(Map::new());
        }
        debug!(resolvers = self.resolvers.len(), "deserializing record");

        for resolver in self.resolvers.iter() {
            let extracted = get_path(source, resolver.source_path()).cloned();
            let outcome = chain::run(
                resolver.source_path(),
                extracted,
                resolver.steps(),
                resolver.fallback(),
            );

            if let Some(failure) = &outcome.failure {
                debug!(
                    source = resolver.source_path(),
                    kind = %failure.kind,
                    "resolver fell back"
                );
                self.reporter.notify(failure, resolver)?;
            }

            set_path(target, resolver.target_path(), outcome.value)?;
        }

        Ok(target)
    }

    /// Typed variant of [`deserialize`](Self::deserialize): `target` is
    /// converted to JSON, resolved, and converted back.
    pub fn deserialize_into<T>(&self, source: &Value, target: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut record = serde_json::to_value(target)?;
        self.deserialize(source, &mut record)?;
        Ok(serde_json::from_value(record)?)
    }
}

fn validate_all(resolvers: &[Resolver]) -> Result<()> {
    resolvers.iter().try_for_each(Resolver::validate)
}
