//! Registry snapshot persistence
//!
//! The durable form of the registry is one JSON document holding the whole
//! world. Writes go to a sibling temp file first and are renamed into
//! place, so a crash mid-write never leaves a torn snapshot behind.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::registry::store::World;
use crate::types::{CathedraError, Result};

/// File-backed snapshot target
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the world from disk. A missing file is an empty registry, not
    /// an error; a present-but-unreadable file is.
    pub fn load(&self) -> Result<Option<World>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read(&self.path).map_err(|e| {
            CathedraError::Storage(format!(
                "failed to read snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let world: World = serde_json::from_slice(&data).map_err(|e| {
            CathedraError::Storage(format!(
                "failed to parse snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(
            path = %self.path.display(),
            streams = world.streams.len(),
            topics = world.topics.len(),
            submissions = world.submissions.len(),
            "Snapshot loaded"
        );

        Ok(Some(world))
    }

    /// Write the world to disk via temp-file-and-rename.
    pub fn persist(&self, world: &World) -> Result<()> {
        let data = serde_json::to_vec_pretty(world)
            .map_err(|e| CathedraError::Storage(format!("failed to serialize snapshot: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &data).map_err(|e| {
            CathedraError::Storage(format!(
                "failed to write snapshot {}: {}",
                tmp.display(),
                e
            ))
        })?;

        fs::rename(&tmp, &self.path).map_err(|e| {
            CathedraError::Storage(format!(
                "failed to replace snapshot {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}
