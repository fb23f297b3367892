//! Shared enums for fieldmap
//!
//! Severity is parsed from mapping files and the command line, so it gets the
//! same strum + serde treatment as every other user-facing choice.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a resolver failure is reported.
///
/// `None`, `Warn` and `Error` recover locally with the fallback value;
/// `Throw` aborts the whole `deserialize` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "NONE")]
    None,
    #[default]
    #[serde(alias = "WARN")]
    Warn,
    #[serde(alias = "ERROR")]
    Error,
    #[serde(alias = "THROW")]
    Throw,
}

impl Severity {
    /// Whether a failure at this severity aborts the call
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Throw)
    }

    /// Whether a failure at this severity produces a diagnostic line
    pub fn is_logged(&self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }
}
