//! Manifest (recipe) synthesis.
//!
//! The synthesized recipe starts from an empty base and adds one converted
//! file per layer, in ordinal order:
//!
//! ```text
//! FROM scratch
//! ADD <layer_id_0>.img /0.img
//! ADD <layer_id_1>.img /1.img
//! ...
//! CMD ["bash"]            (custom builds only, when the source recipe ends in CMD)
//! ```
//!
//! Later directives win at overlapping paths, which reproduces the
//! bottom-to-top precedence of the source image.

use std::path::{Path, PathBuf};

use cfs_gen_core::error::{CfsError, Result};
use cfs_gen_core::{ConversionResult, LayerDescriptor};

/// Base directive every synthesized recipe starts with.
pub const BASE_DIRECTIVE: &str = "FROM scratch";

/// Keyword of the command directive carried over from custom builds.
const COMMAND_KEYWORD: &str = "CMD";

/// One content-add directive: `ADD <source> /<destination>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddDirective {
    /// File inside the working directory (`<layer_id>.img`)
    pub source: String,
    /// File at the image root (`<ordinal>.img`)
    pub destination: String,
}

impl AddDirective {
    fn for_layer(layer: &LayerDescriptor) -> Self {
        Self {
            source: layer.file_name(),
            destination: layer.ordinal_file_name(),
        }
    }

    pub fn render(&self) -> String {
        format!("ADD {} /{}", self.source, self.destination)
    }
}

/// A synthesized recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDraft {
    adds: Vec<AddDirective>,
    command: Option<String>,
}

impl ManifestDraft {
    /// Draft for `layers`, which must carry contiguous ordinals starting at
    /// zero. They are emitted in ordinal order regardless of slice order.
    pub fn for_layers(layers: &[LayerDescriptor], command: Option<&str>) -> Result<Self> {
        let mut ordered: Vec<&LayerDescriptor> = layers.iter().collect();
        ordered.sort_by_key(|l| l.ordinal);

        for (position, layer) in ordered.iter().enumerate() {
            if layer.ordinal != position {
                return Err(CfsError::Conversion {
                    layer_id: layer.layer_id.clone(),
                    message: format!(
                        "ordinal {} breaks the contiguous sequence at {}",
                        layer.ordinal, position
                    ),
                });
            }
        }

        Ok(Self {
            adds: ordered.into_iter().map(AddDirective::for_layer).collect(),
            command: command.map(|c| c.trim_end().to_string()),
        })
    }

    pub fn directives(&self) -> &[AddDirective] {
        &self.adds
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Files the recipe expects to find in its build context.
    pub fn referenced_files(&self) -> Vec<&str> {
        self.adds.iter().map(|a| a.source.as_str()).collect()
    }

    /// Recipe text, newline-terminated.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.adds.len() + 2);
        lines.push(BASE_DIRECTIVE.to_string());
        lines.extend(self.adds.iter().map(AddDirective::render));
        if let Some(command) = &self.command {
            lines.push(command.clone());
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    /// Write the recipe to `dir/name`, returning the path written.
    pub fn write_to(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, self.render()).map_err(|e| CfsError::filesystem(&path, e))?;
        tracing::debug!(path = %path.display(), directives = self.adds.len(), "Wrote recipe");
        Ok(path)
    }
}

/// Synthesize the recipe from conversion results.
///
/// Every result must have succeeded; results are ordered by the ordinal of
/// their descriptor, never by the order they were collected in.
pub fn synthesize(results: &[ConversionResult], command: Option<&str>) -> Result<ManifestDraft> {
    if let Some(failed) = results.iter().find(|r| !r.succeeded) {
        return Err(CfsError::Conversion {
            layer_id: failed.descriptor.layer_id.clone(),
            message: "layer was not converted".to_string(),
        });
    }
    let layers: Vec<LayerDescriptor> = results.iter().map(|r| r.descriptor.clone()).collect();
    ManifestDraft::for_layers(&layers, command)
}

/// Return the last line of `recipe` if it is a command directive.
///
/// Only the final line is considered; a command directive anywhere else is
/// ignored, as is a final line that is blank.
pub fn trailing_command(recipe: &str) -> Option<String> {
    let last = recipe.lines().last()?.trim_end_matches('\r');
    let (keyword, _) = split_first_word(last);
    if keyword.eq_ignore_ascii_case(COMMAND_KEYWORD) {
        Some(last.to_string())
    } else {
        None
    }
}

/// Read the recipe at `path` and return its trailing command directive.
pub fn read_trailing_command(path: &Path) -> Result<Option<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| CfsError::filesystem(path, e))?;
    let command = trailing_command(&content);
    if let Some(command) = &command {
        tracing::info!(command = %command, "Carrying over command directive");
    }
    Ok(command)
}

/// Split a string into the first word and the rest.
fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}
