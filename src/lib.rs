//! fieldmap library
//!
//! Declarative field mapping and validation for JSON records. A
//! [`Deserializer`] resolves each target field from a source record through
//! a chain of operator and validator steps, substituting a fallback and
//! reporting through a severity channel whenever a step fails.
//!
//! ```ignore
//! use fieldmap::{resolve, Deserializer, DeserializerConfig};
//! use serde_json::json;
//!
//! let deserializer = Deserializer::new(DeserializerConfig::new(vec![
//!     resolve("name").fallback(""),
//!     resolve("a.b").to("val").step(fieldmap::steps::parse_int()).validate_number().fallback(0),
//! ]))?;
//!
//! let mut target = json!({});
//! deserializer.deserialize(&json!({"a": {"b": "42"}}), &mut target)?;
//! assert_eq!(target, json!({"name": "", "val": 42}));
//! ```

pub mod chain;
pub mod cli;
pub mod deserializer;
pub mod error;
pub mod mapping_file;
pub mod path;
pub mod reporter;
pub mod resolver;
pub mod steps;
pub mod types;

pub use chain::{ChainOutcome, Failure, FailureKind};
pub use deserializer::{Deserializable, Deserializer, DeserializerConfig};
pub use error::{DeserializeError, Result};
pub use mapping_file::{FieldMapping, MappingFile};
pub use path::{get_path, get_path_with, set_path};
pub use reporter::{ErrorType, ReportSink, Reporter, TracingSink};
pub use resolver::{resolve, Fallback, Resolver, ResolverBuilder, Step};
pub use steps::BuiltinStep;
pub use types::Severity;
