//! Layer topology extraction.
//!
//! The overlay storage driver reports its layers as `LowerDir` (a
//! colon-separated list, most recent first) and `UpperDir` (the top layer).
//! Union precedence is bottom-to-top, so the lower list is reversed and the
//! upper directory appended last.
//!
//! ```text
//! LowerDir = /a/1/diff:/a/2/diff     UpperDir = /a/3/diff
//!
//!   ordinal 0  /a/2/diff   (oldest)
//!   ordinal 1  /a/1/diff
//!   ordinal 2  /a/3/diff   (top)
//! ```

use std::path::PathBuf;

use cfs_gen_core::error::{CfsError, Result};
use cfs_gen_core::{ImageReference, LayerDescriptor};
use serde_json::Value;

use crate::engine::ContainerEngine;

/// Storage drivers whose metadata has the `LowerDir`/`UpperDir` shape.
const SUPPORTED_DRIVERS: &[&str] = &["overlay2", "overlay"];

/// Order layer directories bottom-to-top.
///
/// An absent or empty `lower` yields only the upper directory. Empty
/// segments inside `lower` are rejected.
pub fn order_layer_dirs(
    lower: Option<&str>,
    upper: &str,
) -> std::result::Result<Vec<PathBuf>, String> {
    let mut dirs = Vec::new();

    if let Some(lower) = lower.filter(|l| !l.is_empty()) {
        for segment in lower.split(':') {
            if segment.is_empty() {
                return Err(format!("empty entry in LowerDir '{}'", lower));
            }
            dirs.push(PathBuf::from(segment));
        }
        dirs.reverse();
    }

    dirs.push(PathBuf::from(upper));
    Ok(dirs)
}

/// Build descriptors from an image inspection document.
pub fn layers_from_inspect(image: &ImageReference, doc: &Value) -> Result<Vec<LayerDescriptor>> {
    let malformed = |message: String| CfsError::Inspection {
        image: image.to_string(),
        message,
    };

    let driver = doc
        .get("GraphDriver")
        .filter(|v| v.is_object())
        .ok_or_else(|| malformed("missing GraphDriver metadata".to_string()))?;

    if let Some(name) = driver.get("Name").and_then(Value::as_str) {
        if !SUPPORTED_DRIVERS.contains(&name) {
            return Err(malformed(format!("unsupported storage driver '{}'", name)));
        }
    }

    let data = driver
        .get("Data")
        .filter(|v| v.is_object())
        .ok_or_else(|| malformed("missing GraphDriver.Data".to_string()))?;

    let lower = match data.get("LowerDir") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => return Err(malformed("GraphDriver.Data.LowerDir is not a string".to_string())),
    };
    if lower.is_none() {
        tracing::info!(image = %image, "No lower dir in image");
    }

    let upper = data
        .get("UpperDir")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing GraphDriver.Data.UpperDir".to_string()))?;

    let dirs = order_layer_dirs(lower, upper).map_err(malformed)?;

    dirs.into_iter()
        .enumerate()
        .map(|(ordinal, dir)| {
            LayerDescriptor::new(dir, ordinal).map_err(|e| match e {
                CfsError::Inspection { message, .. } => malformed(message),
                other => other,
            })
        })
        .collect()
}

/// Inspect `image` and return its layers bottom-to-top.
pub async fn extract_layers(
    engine: &dyn ContainerEngine,
    image: &ImageReference,
) -> Result<Vec<LayerDescriptor>> {
    let doc = engine
        .inspect(image)
        .await
        .map_err(|e| CfsError::Inspection {
            image: image.to_string(),
            message: e.to_string(),
        })?;

    let layers = layers_from_inspect(image, &doc)?;
    for layer in &layers {
        tracing::debug!(
            ordinal = layer.ordinal,
            layer_id = %layer.layer_id,
            dir = %layer.source_dir.display(),
            "Layer"
        );
    }
    tracing::info!(image = %image, count = layers.len(), "Extracted layer topology");
    Ok(layers)
}
