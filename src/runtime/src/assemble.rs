//! Final image assembly.

use cfs_gen_core::error::{CfsError, Result};
use cfs_gen_core::ImageReference;

use crate::engine::ContainerEngine;
use crate::fs::WorkDir;
use crate::manifest::ManifestDraft;

/// Build the image tagged `tag` from the recipe and converted files in
/// `workdir`.
///
/// The recipe file and every file it references must already exist in the
/// working directory; a missing one fails before the engine is invoked.
pub async fn assemble_image(
    engine: &dyn ContainerEngine,
    workdir: &WorkDir,
    manifest: &ManifestDraft,
    recipe_name: &str,
    tag: &str,
) -> Result<ImageReference> {
    let assembly_error = |message: String| CfsError::Assembly {
        tag: tag.to_string(),
        message,
    };

    let recipe = workdir.recipe_file(recipe_name);
    if !recipe.is_file() {
        return Err(assembly_error(format!(
            "recipe {} is missing",
            recipe.display()
        )));
    }
    for file in manifest.referenced_files() {
        let path = workdir.path().join(file);
        if !path.is_file() {
            return Err(assembly_error(format!(
                "referenced file {} is missing",
                path.display()
            )));
        }
    }

    tracing::info!(tag = %tag, context = %workdir.path().display(), "Building output image");
    engine
        .build(workdir.path(), &recipe, tag)
        .await
        .map_err(|e| assembly_error(e.to_string()))?;

    Ok(ImageReference::new(tag))
}
