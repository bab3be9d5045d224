use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by modelcheck.
///
/// Only infrastructure failures surface here. Disagreements between the model
/// and the database are reported as [`crate::reconcile::Discrepancy`] values.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The database schema reader could not return metadata.
    #[error("error retrieving the database schema: {message}")]
    SchemaRead {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The mapping description is structurally invalid.
    #[error("invalid mapping description: {message}")]
    Mapping { message: Cow<'static, str> },

    /// The serialized mapping description is not well-formed XML.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A JSON snapshot could not be parsed or written.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An exclusion pattern is not a valid regular expression.
    #[error("invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl CheckError {
    /// Wrap a failure raised while reading the live schema.
    pub fn schema_read<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::SchemaRead {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Convenience helper for a malformed mapping description.
    pub fn mapping(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CheckError>;
