//! Mapping extraction: turning an ORM's mapping metadata into a [`ModelSchema`].

mod document;
mod edmx;

use std::path::{Path, PathBuf};

pub use document::Element;
pub use edmx::{EdmxMappingProvider, extract};

use crate::errors::Result;
use crate::schema::ModelSchema;

/// Source of the canonical model.
///
/// Implementations return empty collections, not an error, when the mapping
/// exposes nothing to check.
pub trait MappingProvider {
    fn model_schema(&self) -> Result<ModelSchema>;
}

/// An already extracted model is its own provider.
impl MappingProvider for ModelSchema {
    fn model_schema(&self) -> Result<ModelSchema> {
        Ok(self.clone())
    }
}

impl<P: MappingProvider + ?Sized> MappingProvider for &P {
    fn model_schema(&self) -> Result<ModelSchema> {
        (**self).model_schema()
    }
}

impl<P: MappingProvider + ?Sized> MappingProvider for Box<P> {
    fn model_schema(&self) -> Result<ModelSchema> {
        (**self).model_schema()
    }
}

/// Loads a model previously saved as a JSON snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotMappingProvider {
    path: PathBuf,
}

impl SnapshotMappingProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MappingProvider for SnapshotMappingProvider {
    fn model_schema(&self) -> Result<ModelSchema> {
        ModelSchema::load(&self.path)
    }
}
