//! Mapping files: a JSON description of a deserializer.
//!
//! ```json
//! {
//!   "severity": "warn",
//!   "fields": [
//!     { "from": "a.b", "to": "val", "steps": ["parse_int", "validate_number"], "fallback": 0 },
//!     { "from": "name", "fallback": "", "severity": "none" }
//!   ]
//! }
//! ```
//!
//! Steps are referenced by [`BuiltinStep`] name. A field without `fallback`
//! falls back to undefined; `"fallback": null` falls back to `null`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::deserializer::DeserializerConfig;
use crate::path::validate_path;
use crate::resolver::{resolve, Resolver};
use crate::steps::BuiltinStep;
use crate::types::Severity;

/// Mapping document that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

/// One resolver in a mapping document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub fallback: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Distinguishes `"fallback": null` (Some(Null)) from an absent key (None).
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FieldMapping {
    /// Compile this entry into a resolver.
    pub fn to_resolver(&self) -> Result<Resolver> {
        let mut builder = resolve(self.from.clone());
        if let Some(to) = &self.to {
            builder = builder.to(to.clone());
        }
        for name in &self.steps {
            let step: BuiltinStep = name
                .parse()
                .with_context(|| format!("Unknown step `{}` on field `{}`", name, self.from))?;
            builder = builder.step(step.to_step());
        }
        if let Some(severity) = self.severity {
            builder = builder.severity(severity);
        }
        Ok(match &self.fallback {
            Some(value) => builder.fallback(value.clone()),
            None => builder.fallback_undefined(),
        })
    }
}

impl MappingFile {
    /// Save mapping to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize mapping to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write mapping to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load mapping from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read mapping from {:?}", path.as_ref()))?;

        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse mapping JSON")
    }

    /// Validate the mapping
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            anyhow::bail!("Mapping must define at least one field");
        }

        for (index, field) in self.fields.iter().enumerate() {
            validate_path(&field.from)
                .with_context(|| format!("Field #{} has an invalid `from` path", index))?;
            if let Some(to) = &field.to {
                validate_path(to)
                    .with_context(|| format!("Field #{} has an invalid `to` path", index))?;
            }
            for name in &field.steps {
                if name.parse::<BuiltinStep>().is_err() {
                    anyhow::bail!("Field `{}` uses unknown step `{}`", field.from, name);
                }
            }
        }

        Ok(())
    }

    pub fn to_resolvers(&self) -> Result<Vec<Resolver>> {
        self.fields.iter().map(FieldMapping::to_resolver).collect()
    }

    /// Validate and compile into a deserializer configuration.
    pub fn to_config(&self) -> Result<DeserializerConfig> {
        self.validate()?;
        Ok(DeserializerConfig::new(self.to_resolvers()?).with_severity(self.severity))
    }
}
