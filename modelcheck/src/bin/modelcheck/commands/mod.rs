pub mod check;
pub mod model;

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use modelcheck::{EdmxMappingProvider, ExclusionPredicate, MappingProvider, SnapshotMappingProvider};

use crate::context::{CONFIG_FILE, ProjectContext};

/// Where the model comes from: an EDMX mapping or a saved JSON snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Mapping(PathBuf),
    Snapshot(PathBuf),
}

impl ModelSource {
    /// Command-line paths win over the `[model]` section of the config file.
    pub fn resolve(
        ctx: &ProjectContext,
        mapping: Option<PathBuf>,
        snapshot: Option<PathBuf>,
    ) -> Result<Self> {
        if let Some(path) = mapping {
            return Ok(ModelSource::Mapping(path));
        }
        if let Some(path) = snapshot {
            return Ok(ModelSource::Snapshot(path));
        }

        let settings = &ctx.config.model;
        if let Some(path) = &settings.mapping {
            return Ok(ModelSource::Mapping(ctx.resolve(path)));
        }
        if let Some(path) = &settings.snapshot {
            return Ok(ModelSource::Snapshot(ctx.resolve(path)));
        }

        bail!("No model given. Pass --mapping or --model-snapshot, or set [model] in {CONFIG_FILE}")
    }

    pub fn provider(&self, exclusions: ExclusionPredicate) -> Result<Box<dyn MappingProvider>> {
        match self {
            ModelSource::Mapping(path) => {
                let provider = EdmxMappingProvider::from_path(path)
                    .with_context(|| format!("Failed to load mapping {}", path.display()))?;
                Ok(Box::new(provider.with_exclusions(exclusions)))
            }
            ModelSource::Snapshot(path) => Ok(Box::new(SnapshotMappingProvider::new(path))),
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Mapping(path) => write!(f, "{} (mapping)", path.display()),
            ModelSource::Snapshot(path) => write!(f, "{} (snapshot)", path.display()),
        }
    }
}

/// `--exclude` flags replace the configured patterns; with neither, the
/// default bookkeeping pattern applies.
pub fn exclusions(ctx: &ProjectContext, flags: &[String]) -> Result<ExclusionPredicate> {
    let patterns = if !flags.is_empty() {
        flags
    } else if let Some(configured) = &ctx.config.model.exclude {
        configured.as_slice()
    } else {
        return Ok(ExclusionPredicate::default());
    };

    ExclusionPredicate::from_patterns(patterns).context("Invalid --exclude pattern")
}
