use std::path::PathBuf;

use thiserror::Error;

/// cfs-gen error types
///
/// Each variant names the pipeline stage that failed and carries the
/// offending entity (image name, layer id, path, or tag).
#[derive(Error, Debug)]
pub enum CfsError {
    /// Image could not be built, found locally, or pulled
    #[error("Resolution failed for image {image}: {message}")]
    Resolution { image: String, message: String },

    /// Storage-driver metadata is missing or malformed
    #[error("Inspection failed for image {image}: {message}")]
    Inspection { image: String, message: String },

    /// External conversion tool failed for a layer
    #[error("Conversion failed for layer {layer_id}: {message}")]
    Conversion { layer_id: String, message: String },

    /// Final image build failed
    #[error("Assembly failed for image {tag}: {message}")]
    Assembly { tag: String, message: String },

    /// Working directory could not be prepared
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run was cancelled before all layers were converted
    #[error("Cancelled after converting {completed}/{total} layers")]
    Cancelled { completed: usize, total: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CfsError {
    /// Process exit code for this error.
    ///
    /// `0` is reserved for success; resolution through assembly map to
    /// `1..=4` in pipeline order.
    pub fn exit_code(&self) -> i32 {
        match self {
            CfsError::Resolution { .. } => 1,
            CfsError::Inspection { .. } | CfsError::Serialization(_) => 2,
            CfsError::Conversion { .. } => 3,
            CfsError::Assembly { .. } => 4,
            CfsError::Filesystem { .. } | CfsError::Io(_) => 5,
            CfsError::Config(_) => 6,
            CfsError::Cancelled { .. } => 130,
        }
    }

    /// Shorthand for a filesystem error at `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CfsError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for CfsError {
    fn from(err: serde_json::Error) -> Self {
        CfsError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for CfsError {
    fn from(err: serde_yaml::Error) -> Self {
        CfsError::Config(err.to_string())
    }
}

/// Result type alias for cfs-gen operations
pub type Result<T> = std::result::Result<T, CfsError>;
