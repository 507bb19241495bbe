use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CfsError, Result};

/// How the source image is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Build the image from a context directory containing a recipe
    Custom { context_dir: PathBuf },
    /// Use a named image, pulling it if absent locally
    Premade { image: String },
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Container engine CLI binary
    pub engine: String,

    /// External page-alignment conversion tool
    pub converter: PathBuf,

    /// Parent directory of per-image working directories
    pub work_root: PathBuf,

    /// Prefix applied to the output name to tag custom builds
    pub build_prefix: String,

    /// Recipe filename, both in the build context and the working directory
    pub recipe_name: String,

    /// Request page alignment from the converter
    pub page_align: bool,

    /// Leave the working directory in place after a successful run
    pub keep_workdir: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            converter: PathBuf::from("./main-bf"),
            work_root: PathBuf::from("/tmp"),
            build_prefix: "init-".to_string(),
            recipe_name: "Dockerfile".to_string(),
            page_align: true,
            keep_workdir: true,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CfsError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
            .map_err(|e| CfsError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.engine.trim().is_empty() {
            return Err(CfsError::Config("engine must not be empty".to_string()));
        }
        if self.converter.as_os_str().is_empty() {
            return Err(CfsError::Config("converter must not be empty".to_string()));
        }
        if self.recipe_name.trim().is_empty() || self.recipe_name.contains('/') {
            return Err(CfsError::Config(format!(
                "recipe_name must be a plain file name, got '{}'",
                self.recipe_name
            )));
        }
        Ok(())
    }

    /// Synthetic tag for a custom build of `output_name`.
    pub fn build_tag(&self, output_name: &str) -> String {
        format!("{}{}", self.build_prefix, output_name)
    }
}
