//! Local destinations for fetched artifacts.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use engine_logging::engine_debug;
use tempfile::Builder;
use thiserror::Error;

use crate::artifact::Artifact;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output directory {path:?} is unusable: {source}")]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("could not write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Where a fetched artifact ends up locally.
pub trait ArtifactSink: Send + Sync {
    fn save(&self, artifact: &Artifact) -> Result<PathBuf, SinkError>;
}

/// Saves each artifact under its own filename in one directory.
///
/// The body is written to a hidden `.part` file next to the target and then
/// renamed over it, so the directory holds either the previous download or the
/// complete new one. Downloading the same job again replaces the earlier copy.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn prepare_dir(&self) -> Result<(), SinkError> {
        let unusable = |source| SinkError::OutputDir {
            path: self.dir.clone(),
            source,
        };
        match fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(unusable(io::Error::other("not a directory"))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.dir).map_err(unusable)
            }
            Err(err) => Err(unusable(err)),
        }
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&self, artifact: &Artifact) -> Result<PathBuf, SinkError> {
        self.prepare_dir()?;

        let target = self.dir.join(&artifact.filename);
        let failed = |source: io::Error| SinkError::Write {
            path: target.clone(),
            source,
        };
        let mut part = Builder::new()
            .prefix(&format!(".{}.", artifact.filename))
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(failed)?;
        part.write_all(&artifact.bytes).map_err(failed)?;
        part.as_file().sync_all().map_err(failed)?;
        // Rename replaces an existing target in one step.
        part.persist(&target).map_err(|err| failed(err.error))?;

        engine_debug!("Wrote {} bytes to {}", artifact.bytes.len(), target.display());
        Ok(target)
    }
}
