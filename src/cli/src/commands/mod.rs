//! CLI definition and dispatch.

mod generate;

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use cfs_gen_core::error::{CfsError, Result};
use cfs_gen_core::{PipelineConfig, SourceMode};
use cfs_gen_runtime::PipelineRequest;

/// Flatten a container image's layers into page-aligned files and rebuild it.
///
/// Examples:
///   cfs-gen -p ubuntu-cfs ubuntu
///   cfs-gen -c test-cfs ./context
#[derive(Parser, Debug)]
#[command(name = "cfs-gen", version, about)]
#[command(group(ArgGroup::new("mode").required(true).args(["custom", "premade"])))]
pub struct Cli {
    /// Build the source image from a context directory
    #[arg(
        short = 'c',
        long = "custom",
        num_args = 2,
        value_names = ["OUTPUT_IMAGE", "BUILD_CONTEXT"]
    )]
    pub custom: Option<Vec<String>>,

    /// Use a premade image, pulling it if it is not present locally
    #[arg(
        short = 'p',
        long = "premade",
        num_args = 2,
        value_names = ["OUTPUT_IMAGE", "IMAGE"]
    )]
    pub premade: Option<Vec<String>>,

    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Container engine binary (default: docker)
    #[arg(long)]
    pub engine: Option<String>,

    /// Layer conversion tool (default: ./main-bf)
    #[arg(long)]
    pub converter: Option<PathBuf>,

    /// Parent directory for the working directory (default: /tmp)
    #[arg(long)]
    pub work_root: Option<PathBuf>,

    /// Do not ask the converter for page alignment
    #[arg(long)]
    pub no_page_align: bool,

    /// Remove the working directory after a successful build
    #[arg(long)]
    pub clean: bool,

    /// Print the synthesized recipe without converting or building
    #[arg(long)]
    pub dry_run: bool,

    /// Print the source image's build history
    #[arg(long)]
    pub history: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Log pipeline progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Pipeline request described by the mode flags.
    pub fn request(&self) -> Result<PipelineRequest> {
        let (output_name, mode) = match (&self.custom, &self.premade) {
            (Some(values), None) => {
                let (output, context) = pair(values, "-c")?;
                (
                    output,
                    SourceMode::Custom {
                        context_dir: PathBuf::from(context),
                    },
                )
            }
            (None, Some(values)) => {
                let (output, image) = pair(values, "-p")?;
                (output, SourceMode::Premade { image })
            }
            _ => {
                return Err(CfsError::Config(
                    "exactly one of -c or -p is required".to_string(),
                ))
            }
        };

        if output_name.trim().is_empty() {
            return Err(CfsError::Config("output image name is empty".to_string()));
        }

        Ok(PipelineRequest {
            mode,
            output_name,
            dry_run: self.dry_run,
            quiet: self.quiet,
        })
    }

    /// Configuration from `--config` (or defaults) with flag overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(engine) = &self.engine {
            config.engine = engine.clone();
        }
        if let Some(converter) = &self.converter {
            config.converter = converter.clone();
        }
        if let Some(work_root) = &self.work_root {
            config.work_root = work_root.clone();
        }
        if self.no_page_align {
            config.page_align = false;
        }
        if self.clean {
            config.keep_workdir = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn pair(values: &[String], flag: &str) -> Result<(String, String)> {
    match values {
        [first, second] => Ok((first.clone(), second.clone())),
        _ => Err(CfsError::Config(format!("{flag} takes exactly two values"))),
    }
}

/// Dispatch a parsed CLI to the pipeline.
pub async fn dispatch(cli: Cli) -> Result<()> {
    generate::execute(cli).await
}
