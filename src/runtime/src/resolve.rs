//! Source image resolution.
//!
//! Produces the [`ImageReference`] the rest of the pipeline works on, either
//! by building a context directory or by making sure a named image is
//! present locally.

use cfs_gen_core::error::{CfsError, Result};
use cfs_gen_core::{ImageReference, PipelineConfig, SourceMode};

use crate::engine::ContainerEngine;

/// Resolve the source image for `mode`.
///
/// Custom builds use `<context>/<recipe_name>` and are tagged
/// `<build_prefix><output_name>`. Premade images are pulled only when the
/// exact reference is not present locally.
pub async fn resolve_image(
    engine: &dyn ContainerEngine,
    mode: &SourceMode,
    output_name: &str,
    config: &PipelineConfig,
    quiet: bool,
) -> Result<ImageReference> {
    match mode {
        SourceMode::Custom { context_dir } => {
            let tag = config.build_tag(output_name);
            if !context_dir.is_dir() {
                return Err(CfsError::Resolution {
                    image: tag,
                    message: format!(
                        "build context '{}' is not a directory",
                        context_dir.display()
                    ),
                });
            }

            let recipe = context_dir.join(&config.recipe_name);
            if !recipe.is_file() {
                return Err(CfsError::Resolution {
                    image: tag,
                    message: format!("recipe '{}' not found", recipe.display()),
                });
            }

            if !quiet {
                println!("Building image..");
            }
            tracing::info!(tag = %tag, recipe = %recipe.display(), "Building source image");
            engine
                .build(context_dir, &recipe, &tag)
                .await
                .map_err(|e| CfsError::Resolution {
                    image: tag.clone(),
                    message: e.to_string(),
                })?;
            Ok(ImageReference::new(tag))
        }

        SourceMode::Premade { image } => {
            let present = engine
                .image_exists(image)
                .await
                .map_err(|e| CfsError::Resolution {
                    image: image.clone(),
                    message: e.to_string(),
                })?;

            if present {
                tracing::info!(image = %image, "Image present locally");
            } else {
                if !quiet {
                    println!("Downloading image..");
                }
                tracing::info!(image = %image, "Pulling image");
                engine.pull(image).await.map_err(|e| CfsError::Resolution {
                    image: image.clone(),
                    message: e.to_string(),
                })?;
            }
            Ok(ImageReference::new(image.clone()))
        }
    }
}
