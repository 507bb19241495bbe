//! Working directory management.
//!
//! Each run owns one directory, `<work_root>/<image>/`, holding the converted
//! layer files and the synthesized recipe. Runs must not share a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cfs_gen_core::error::{CfsError, Result};
use cfs_gen_core::{ImageReference, LayerDescriptor};

/// Create `path` as a directory, treating "already exists" as success.
///
/// Returns `true` if the directory was created by this call. An existing
/// non-directory at `path` is an error.
pub fn ensure_dir(path: &Path) -> Result<bool> {
    match std::fs::create_dir(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
        Err(e) => Err(CfsError::filesystem(path, e)),
    }
}

/// The per-run working directory (build context of the final image).
#[derive(Debug, Clone)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Directory for `image` under `work_root`, without touching the disk.
    pub fn for_image(work_root: &Path, image: &ImageReference) -> Self {
        Self {
            path: work_root.join(image.path_segment()),
        }
    }

    /// Create the directory. Repeated calls are no-ops.
    pub fn create(&self) -> Result<()> {
        if ensure_dir(&self.path)? {
            tracing::debug!(path = %self.path.display(), "Created working directory");
        } else {
            tracing::debug!(path = %self.path.display(), "Reusing working directory");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Destination of the converted file for `layer`.
    pub fn layer_file(&self, layer: &LayerDescriptor) -> PathBuf {
        self.path.join(layer.file_name())
    }

    /// Path of the recipe file named `recipe_name`.
    pub fn recipe_file(&self, recipe_name: &str) -> PathBuf {
        self.path.join(recipe_name)
    }

    /// Remove the directory and everything in it.
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CfsError::filesystem(&self.path, e)),
        }
    }
}
