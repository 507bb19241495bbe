//! End-to-end pipeline orchestration.
//!
//! Stages run strictly one after another; each consumes only the output of
//! the stage before it:
//!
//! ```text
//! resolve -> extract -> (history) -> convert -> synthesize -> assemble
//! ```

use std::path::PathBuf;

use cfs_gen_core::error::Result;
use cfs_gen_core::{
    CancelFlag, ConversionResult, ImageReference, LayerDescriptor, PipelineConfig, SourceMode,
};

use crate::assemble::assemble_image;
use crate::convert::{convert_layers, LayerConverter};
use crate::engine::{ContainerEngine, HistoryEntry};
use crate::fs::WorkDir;
use crate::history::image_history;
use crate::manifest::{read_trailing_command, synthesize, ManifestDraft};
use crate::resolve::resolve_image;
use crate::topology::extract_layers;

/// What to build.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Where the source image comes from
    pub mode: SourceMode,
    /// Tag of the image to produce
    pub output_name: String,
    /// Stop after synthesizing the recipe; convert and assemble nothing
    pub dry_run: bool,
    /// Suppress progress output on stdout
    pub quiet: bool,
}

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Resolved source image
    pub source: ImageReference,
    /// Built image (`None` on dry runs)
    pub output: Option<ImageReference>,
    /// Working directory used by the run
    pub workdir: PathBuf,
    /// Whether the working directory was removed after assembly
    pub workdir_removed: bool,
    /// Layers, bottom-to-top
    pub layers: Vec<LayerDescriptor>,
    /// One per layer (empty on dry runs)
    pub conversions: Vec<ConversionResult>,
    /// Build history, oldest first (empty if it could not be read)
    pub history: Vec<HistoryEntry>,
    /// Synthesized recipe text
    pub manifest: String,
}

/// The layer flattening pipeline.
///
/// Borrows one engine client and one converter for its whole lifetime.
pub struct Pipeline<'a> {
    engine: &'a dyn ContainerEngine,
    converter: &'a dyn LayerConverter,
    config: &'a PipelineConfig,
    cancel: CancelFlag,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        engine: &'a dyn ContainerEngine,
        converter: &'a dyn LayerConverter,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            engine,
            converter,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Use `cancel` to stop the run between layer conversions.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every stage for `request`.
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineReport> {
        let source = resolve_image(
            self.engine,
            &request.mode,
            &request.output_name,
            self.config,
            request.quiet,
        )
        .await?;

        let layers = extract_layers(self.engine, &source).await?;

        let history = match image_history(self.engine, &source).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(image = %source, error = %e, "Could not read image history");
                Vec::new()
            }
        };

        let command = match &request.mode {
            SourceMode::Custom { context_dir } => {
                read_trailing_command(&context_dir.join(&self.config.recipe_name))?
            }
            SourceMode::Premade { .. } => None,
        };

        let workdir = WorkDir::for_image(&self.config.work_root, &source);

        if request.dry_run {
            let manifest = ManifestDraft::for_layers(&layers, command.as_deref())?;
            return Ok(PipelineReport {
                source,
                output: None,
                workdir: workdir.path().to_path_buf(),
                workdir_removed: false,
                layers,
                conversions: Vec::new(),
                history,
                manifest: manifest.render(),
            });
        }

        workdir.create()?;

        let conversions = convert_layers(&layers, &workdir, self.converter, &self.cancel).await?;

        let manifest = synthesize(&conversions, command.as_deref())?;
        manifest.write_to(workdir.path(), &self.config.recipe_name)?;

        if !request.quiet {
            println!("Building cfs image..");
        }
        let output = assemble_image(
            self.engine,
            &workdir,
            &manifest,
            &self.config.recipe_name,
            &request.output_name,
        )
        .await?;
        tracing::info!(image = %output, layers = conversions.len(), "Created cfs image");

        let workdir_removed = if self.config.keep_workdir {
            false
        } else {
            workdir.remove()?;
            true
        };

        Ok(PipelineReport {
            source,
            output: Some(output),
            workdir: workdir.path().to_path_buf(),
            workdir_removed,
            layers,
            conversions,
            history,
            manifest: manifest.render(),
        })
    }
}
