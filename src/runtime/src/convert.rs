//! Layer conversion.
//!
//! Runs the external page-alignment tool once per layer, strictly in ordinal
//! order, one layer at a time. Output files are named by layer id; the
//! ordinal travels alongside in each [`ConversionResult`].

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use cfs_gen_core::error::{CfsError, Result};
use cfs_gen_core::{CancelFlag, ConversionResult, LayerDescriptor};
use tokio::process::Command;

use crate::fs::WorkDir;

/// Converts one layer directory into a flat image file.
#[async_trait]
pub trait LayerConverter: Send + Sync {
    /// Check the converter can run at all. Called once before the first layer.
    async fn preflight(&self) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Convert `layer.source_dir` into `dest`. Must not return until done.
    async fn convert(&self, layer: &LayerDescriptor, dest: &Path) -> Result<()>;
}

/// The external conversion binary.
///
/// Invoked as `<program> -w -dir=<src> -o=<dest> [-pagealign]`.
#[derive(Debug, Clone)]
pub struct ConverterTool {
    program: PathBuf,
    page_align: bool,
}

impl ConverterTool {
    pub fn new(program: impl Into<PathBuf>, page_align: bool) -> Self {
        Self {
            program: program.into(),
            page_align,
        }
    }

    /// Arguments for converting `source` into `dest`.
    pub fn args(&self, source: &Path, dest: &Path) -> Vec<String> {
        let mut args = vec![
            "-w".to_string(),
            format!("-dir={}", source.display()),
            format!("-o={}", dest.display()),
        ];
        if self.page_align {
            args.push("-pagealign".to_string());
        }
        args
    }
}

#[async_trait]
impl LayerConverter for ConverterTool {
    async fn preflight(&self) -> std::result::Result<(), String> {
        // Bare names are resolved through PATH at spawn time.
        if self.program.components().count() > 1 && !self.program.is_file() {
            return Err(format!(
                "converter '{}' not found",
                self.program.display()
            ));
        }
        Ok(())
    }

    async fn convert(&self, layer: &LayerDescriptor, dest: &Path) -> Result<()> {
        let conversion_error = |message: String| CfsError::Conversion {
            layer_id: layer.layer_id.clone(),
            message,
        };

        let output = Command::new(&self.program)
            .args(self.args(&layer.source_dir, dest))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                conversion_error(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(conversion_error(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        if !dest.is_file() {
            return Err(conversion_error(format!(
                "{} reported success but {} was not written",
                self.program.display(),
                dest.display()
            )));
        }

        Ok(())
    }
}

/// Convert every layer into `workdir`, in ordinal order.
///
/// Aborts on the first failure. When `cancel` is raised, no further layers
/// are dispatched; files already produced are left in place.
pub async fn convert_layers(
    layers: &[LayerDescriptor],
    workdir: &WorkDir,
    converter: &dyn LayerConverter,
    cancel: &CancelFlag,
) -> Result<Vec<ConversionResult>> {
    let total = layers.len();
    let mut results = Vec::with_capacity(total);

    if let Some(first) = layers.first() {
        converter
            .preflight()
            .await
            .map_err(|message| CfsError::Conversion {
                layer_id: first.layer_id.clone(),
                message,
            })?;
    }

    for (position, layer) in layers.iter().enumerate() {
        if layer.ordinal != position {
            return Err(CfsError::Conversion {
                layer_id: layer.layer_id.clone(),
                message: format!(
                    "layer has ordinal {} at position {}",
                    layer.ordinal, position
                ),
            });
        }

        if cancel.is_cancelled() {
            tracing::warn!(completed = results.len(), total, "Conversion cancelled");
            return Err(CfsError::Cancelled {
                completed: results.len(),
                total,
            });
        }

        let dest = workdir.layer_file(layer);
        tracing::info!(
            ordinal = layer.ordinal,
            layer_id = %layer.layer_id,
            source = %layer.source_dir.display(),
            "Converting layer"
        );
        match converter.convert(layer, &dest).await {
            Ok(()) => {}
            // An interrupt also reaches the converter's process group.
            Err(e) if cancel.is_cancelled() => {
                tracing::warn!(layer_id = %layer.layer_id, error = %e, "Conversion interrupted");
                return Err(CfsError::Cancelled {
                    completed: results.len(),
                    total,
                });
            }
            Err(e) => return Err(e),
        }

        results.push(ConversionResult {
            descriptor: layer.clone(),
            output_file: dest,
            succeeded: true,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converter_args_page_align() {
        let tool = ConverterTool::new("./main-bf", true);
        let args = tool.args(Path::new("/a/1/diff"), Path::new("/tmp/ubuntu/1.img"));
        assert_eq!(
            args,
            vec!["-w", "-dir=/a/1/diff", "-o=/tmp/ubuntu/1.img", "-pagealign"]
        );
    }

    #[test]
    fn test_converter_args_no_page_align() {
        let tool = ConverterTool::new("zar", false);
        let args = tool.args(Path::new("/a/1/diff"), Path::new("/out/1.img"));
        assert_eq!(args.len(), 3);
        assert!(!args.contains(&"-pagealign".to_string()));
    }

    #[tokio::test]
    async fn test_preflight_missing_path() {
        let tool = ConverterTool::new("/nonexistent/main-bf", true);
        assert!(tool.preflight().await.is_err());
    }

    #[tokio::test]
    async fn test_preflight_bare_name() {
        let tool = ConverterTool::new("main-bf", true);
        assert!(tool.preflight().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_with_script() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let script = tmp.path().join("fake-zar.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in -o=*) echo layer > \"${a#-o=}\";; esac; done\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tool = ConverterTool::new(&script, true);
        let layer = LayerDescriptor::new("/a/abc/diff", 0).unwrap();
        let dest = tmp.path().join("abc.img");
        tool.convert(&layer, &dest).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "layer\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_nonzero_exit() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let script = tmp.path().join("failing.sh");
        std::fs::write(&script, "#!/bin/sh\necho 'bad layer' >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tool = ConverterTool::new(&script, true);
        let layer = LayerDescriptor::new("/a/abc/diff", 0).unwrap();
        let err = tool
            .convert(&layer, &tmp.path().join("abc.img"))
            .await
            .unwrap_err();
        match err {
            CfsError::Conversion { layer_id, message } => {
                assert_eq!(layer_id, "abc");
                assert!(message.contains("exited with 3"));
                assert!(message.contains("bad layer"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_success_without_output() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let script = tmp.path().join("noop.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let tool = ConverterTool::new(&script, true);
        let layer = LayerDescriptor::new("/a/abc/diff", 0).unwrap();
        let err = tool
            .convert(&layer, &tmp.path().join("abc.img"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("was not written"));
    }
}
