//! Layer data model.
//!
//! Layers are identified two ways: by the `layer_id` parsed from their
//! storage-driver directory (used to name the converted file on disk), and
//! by their `ordinal` position in bottom-to-top order (used to name the file
//! inside the synthesized image). The pairing is fixed once by the extractor.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CfsError, Result};

/// File extension of a converted, page-aligned layer image.
pub const IMAGE_EXTENSION: &str = "img";

/// Opaque name/tag of an image resolved in the local engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name safe to use as a single path segment.
    ///
    /// `/` and `:` are replaced so that `library/ubuntu:22.04` maps to
    /// `library_ubuntu_22.04`.
    pub fn path_segment(&self) -> String {
        self.0
            .chars()
            .map(|c| if c == '/' || c == ':' { '_' } else { c })
            .collect()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One union-filesystem layer in bottom-to-top order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Layer directory as reported by the storage driver
    pub source_dir: PathBuf,
    /// Identifier parsed from `source_dir`
    pub layer_id: String,
    /// 0-based position in bottom-to-top order
    pub ordinal: usize,
}

impl LayerDescriptor {
    /// Build a descriptor, parsing the layer id from `source_dir`.
    pub fn new(source_dir: impl Into<PathBuf>, ordinal: usize) -> Result<Self> {
        let source_dir = source_dir.into();
        let layer_id = parse_layer_id(&source_dir)?;
        Ok(Self {
            source_dir,
            layer_id,
            ordinal,
        })
    }

    /// On-disk name of the converted file: `<layer_id>.img`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.layer_id, IMAGE_EXTENSION)
    }

    /// Name of the file inside the synthesized image: `<ordinal>.img`.
    pub fn ordinal_file_name(&self) -> String {
        format!("{}.{}", self.ordinal, IMAGE_EXTENSION)
    }
}

/// Outcome of converting one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub descriptor: LayerDescriptor,
    pub output_file: PathBuf,
    pub succeeded: bool,
}

/// Parse the layer id from a storage-driver layer directory.
///
/// The id is the second-to-last path segment: `/var/lib/docker/overlay2/<id>/diff`
/// yields `<id>`. A trailing slash is ignored. Paths with fewer than two
/// segments or containing `.`/`..` segments are rejected.
pub fn parse_layer_id(dir: &Path) -> Result<String> {
    let malformed = |reason: &str| CfsError::Inspection {
        image: String::new(),
        message: format!("malformed layer directory '{}': {}", dir.display(), reason),
    };

    let mut segments = Vec::new();
    for component in dir.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment
                    .to_str()
                    .ok_or_else(|| malformed("path is not valid UTF-8"))?;
                segments.push(segment);
            }
            Component::RootDir | Component::Prefix(_) => {}
            Component::CurDir | Component::ParentDir => {
                return Err(malformed("relative segments are not allowed"));
            }
        }
    }

    if segments.len() < 2 {
        return Err(malformed("expected at least two path segments"));
    }

    let id = segments[segments.len() - 2];
    if id.trim().is_empty() {
        return Err(malformed("empty layer id"));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layer_id_overlay2() {
        let id = parse_layer_id(Path::new("/var/lib/docker/overlay2/3f2a9c/diff")).unwrap();
        assert_eq!(id, "3f2a9c");
    }

    #[test]
    fn test_parse_layer_id_trailing_slash() {
        let id = parse_layer_id(Path::new("/a/1/diff/")).unwrap();
        assert_eq!(id, "1");
    }

    #[test]
    fn test_parse_layer_id_too_short() {
        let err = parse_layer_id(Path::new("/diff")).unwrap_err();
        assert!(matches!(err, CfsError::Inspection { .. }));
        assert!(err.to_string().contains("/diff"));
    }

    #[test]
    fn test_parse_layer_id_empty() {
        assert!(parse_layer_id(Path::new("")).is_err());
    }

    #[test]
    fn test_parse_layer_id_rejects_parent_dir() {
        assert!(parse_layer_id(Path::new("/a/../diff")).is_err());
    }

    #[test]
    fn test_descriptor_file_names() {
        let desc = LayerDescriptor::new("/a/xyz/diff", 4).unwrap();
        assert_eq!(desc.layer_id, "xyz");
        assert_eq!(desc.file_name(), "xyz.img");
        assert_eq!(desc.ordinal_file_name(), "4.img");
    }

    #[test]
    fn test_image_reference_path_segment() {
        let image = ImageReference::new("library/ubuntu:22.04");
        assert_eq!(image.path_segment(), "library_ubuntu_22.04");
        assert_eq!(image.to_string(), "library/ubuntu:22.04");
    }
}
