//! cfs-gen Runtime - layer flattening pipeline.
//!
//! Turns the overlay layers of a container image into page-aligned image
//! files and rebuilds a minimal image that stacks those files in the same
//! precedence order.

pub mod assemble;
pub mod convert;
pub mod engine;
pub mod fs;
pub mod history;
pub mod manifest;
pub mod pipeline;
pub mod resolve;
pub mod topology;

// Re-export common types
pub use convert::{convert_layers, ConverterTool, LayerConverter};
pub use engine::{ContainerEngine, DockerCli, EngineError, HistoryEntry};
pub use fs::{ensure_dir, WorkDir};
pub use manifest::{synthesize, ManifestDraft};
pub use pipeline::{Pipeline, PipelineReport, PipelineRequest};
pub use topology::{extract_layers, order_layer_dirs};
