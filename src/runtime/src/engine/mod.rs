//! Container engine seam.
//!
//! Every pipeline stage talks to the engine through [`ContainerEngine`].
//! One client is constructed per process and passed by reference into each
//! stage; stages translate [`EngineError`] into their own error variant.

mod docker;

use std::path::Path;

use async_trait::async_trait;
use cfs_gen_core::ImageReference;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use docker::DockerCli;

/// Failure reported by the container engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{command}` failed: {message}")]
pub struct EngineError {
    /// Command line (or API call) that failed
    pub command: String,
    pub message: String,
}

impl EngineError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// One entry of an image's build history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Creation timestamp (RFC 3339) if the engine reports one
    pub created: Option<String>,
    /// Instruction that produced the entry
    pub created_by: String,
    /// Size in bytes of the layer the entry produced
    pub size: u64,
    pub comment: String,
}

/// Operations consumed from the container engine.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Whether an image matching this exact reference is present locally.
    async fn image_exists(&self, name: &str) -> Result<bool, EngineError>;

    /// Pull an image from its registry.
    async fn pull(&self, name: &str) -> Result<(), EngineError>;

    /// Build `context_dir` from the recipe at `recipe` and tag it `tag`.
    async fn build(
        &self,
        context_dir: &Path,
        recipe: &Path,
        tag: &str,
    ) -> Result<(), EngineError>;

    /// Raw inspection document for an image (including `GraphDriver`).
    async fn inspect(&self, image: &ImageReference) -> Result<serde_json::Value, EngineError>;

    /// Build history in engine order (most recent first).
    async fn history(&self, image: &ImageReference) -> Result<Vec<HistoryEntry>, EngineError>;
}
