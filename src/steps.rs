//! Built-in steps.
//!
//! These are the steps that can be named from a mapping file. The builder's
//! `validate_*` helpers use the same constructors, so a resolver written in
//! code and one loaded from JSON behave identically.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use strum::{Display, EnumIter, EnumString};

use crate::path::{describe, is_truthy, kind_name};
use crate::resolver::Step;

/// Step names accepted in mapping files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStep {
    Identity,
    Trim,
    Lowercase,
    Uppercase,
    ParseInt,
    ParseFloat,
    ToString,
    ValidateString,
    ValidateNumber,
    ValidateBoolean,
    ValidateArray,
    ValidatePresent,
}

impl BuiltinStep {
    /// Build the step this name stands for
    pub fn to_step(self) -> Step {
        match self {
            Self::Identity => identity(),
            Self::Trim => trim(),
            Self::Lowercase => lowercase(),
            Self::Uppercase => uppercase(),
            Self::ParseInt => parse_int(),
            Self::ParseFloat => parse_float(),
            Self::ToString => to_string(),
            Self::ValidateString => validate_string(),
            Self::ValidateNumber => validate_number(),
            Self::ValidateBoolean => validate_boolean(),
            Self::ValidateArray => validate_array(),
            Self::ValidatePresent => validate_present(),
        }
    }

    pub fn is_validator(&self) -> bool {
        matches!(
            self,
            Self::ValidateString
                | Self::ValidateNumber
                | Self::ValidateBoolean
                | Self::ValidateArray
                | Self::ValidatePresent
        )
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Pass the value through. Installed on resolvers with no steps.
pub fn identity() -> Step {
    Step::operator("identity", Ok)
}

pub fn trim() -> Step {
    Step::operator("trim", |value| {
        map_str(value, "trim", |s| s.trim().to_string())
    })
}

pub fn lowercase() -> Step {
    Step::operator("lowercase", |value| {
        map_str(value, "lowercase", |s| s.to_lowercase())
    })
}

pub fn uppercase() -> Step {
    Step::operator("uppercase", |value| {
        map_str(value, "uppercase", |s| s.to_uppercase())
    })
}

fn map_str(
    value: Option<Value>,
    step: &str,
    func: impl Fn(&str) -> String,
) -> anyhow::Result<Option<Value>> {
    match value {
        Some(Value::String(s)) => Ok(Some(Value::String(func(&s)))),
        None => Ok(None),
        Some(other) => bail!("{} expects a string, found {}", step, kind_name(&other)),
    }
}

/// Integer prefix parse: leading whitespace, optional sign, decimal digits.
/// Trailing garbage is ignored; no digits at all is a failure.
pub fn parse_int() -> Step {
    Step::operator("parse_int", |value| {
        let text = numeric_text(value.as_ref())?;
        let trimmed = text.trim_start();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let end = unsigned
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(unsigned.len());
        if end == 0 {
            bail!("{} does not start with an integer", describe(value.as_ref()));
        }
        let magnitude: i64 = unsigned[..end]
            .parse()
            .with_context(|| format!("{} is out of integer range", text))?;
        Ok(Some(Value::from(if negative { -magnitude } else { magnitude })))
    })
}

/// Parse a whole (trimmed) string as a finite float. Numbers pass through.
pub fn parse_float() -> Step {
    Step::operator("parse_float", |value| {
        if let Some(Value::Number(n)) = &value {
            return Ok(Some(Value::Number(n.clone())));
        }
        let text = numeric_text(value.as_ref())?;
        let parsed: f64 = text
            .trim()
            .parse()
            .with_context(|| format!("{:?} is not a number", text))?;
        let number = Number::from_f64(parsed)
            .with_context(|| format!("{:?} is not a finite number", text))?;
        Ok(Some(Value::Number(number)))
    })
}

fn numeric_text(value: Option<&Value>) -> anyhow::Result<String> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        other => bail!("cannot parse {} as a number", describe(other)),
    }
}

/// Render scalars as strings; arrays and objects become their JSON text.
pub fn to_string() -> Step {
    Step::operator("to_string", |value| {
        Ok(value.map(|v| match v {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }))
    })
}

// ============================================================================
// Validators
// ============================================================================

pub fn validate_string() -> Step {
    Step::validator("validate_string", |value| {
        Ok(matches!(value, Some(Value::String(_))))
    })
}

/// JSON numbers are always finite, so this is a plain type check.
pub fn validate_number() -> Step {
    Step::validator("validate_number", |value| {
        Ok(matches!(value, Some(Value::Number(_))))
    })
}

pub fn validate_boolean() -> Step {
    Step::validator("validate_boolean", |value| {
        Ok(matches!(value, Some(Value::Bool(_))))
    })
}

pub fn validate_array() -> Step {
    Step::validator("validate_array", |value| {
        Ok(matches!(value, Some(Value::Array(_))))
    })
}

/// Passes for any truthy value.
pub fn validate_present() -> Step {
    Step::validator("validate_present", |value| Ok(value.is_some_and(is_truthy)))
}
