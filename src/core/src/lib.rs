//! cfs-gen Core - Foundational Types
//!
//! Data model, error taxonomy, configuration and cancellation shared by the
//! runtime pipeline and the CLI.

pub mod cancel;
pub mod config;
pub mod error;
pub mod layer;

// Re-export commonly used types
pub use cancel::CancelFlag;
pub use config::{PipelineConfig, SourceMode};
pub use error::{CfsError, Result};
pub use layer::{ConversionResult, ImageReference, LayerDescriptor};
