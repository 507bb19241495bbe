//! Build history correlation (diagnostic only).

use cfs_gen_core::error::{CfsError, Result};
use cfs_gen_core::ImageReference;

use crate::engine::{ContainerEngine, HistoryEntry};

/// Fetch the build history of `image` in chronological order (oldest first).
///
/// Nothing downstream depends on the result; the pipeline logs failures and
/// carries on.
pub async fn image_history(
    engine: &dyn ContainerEngine,
    image: &ImageReference,
) -> Result<Vec<HistoryEntry>> {
    let mut entries = engine
        .history(image)
        .await
        .map_err(|e| CfsError::Inspection {
            image: image.to_string(),
            message: e.to_string(),
        })?;
    entries.reverse();

    for (idx, entry) in entries.iter().enumerate() {
        tracing::debug!(
            step = idx,
            size = entry.size,
            created_by = %entry.created_by,
            "History"
        );
    }
    Ok(entries)
}
