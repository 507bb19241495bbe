//! Docker-compatible engine driven through its CLI.
//!
//! Works with any binary that accepts the `docker` command surface
//! (`docker`, `podman`, `nerdctl`). Output is parsed from JSON.

use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use cfs_gen_core::ImageReference;
use serde::Deserialize;
use tokio::process::Command;

use super::{ContainerEngine, EngineError, HistoryEntry};

/// Engine client that shells out to a Docker-compatible CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawn the engine with `args` and collect its output, whatever the exit status.
    async fn output(&self, args: &[&str]) -> Result<Output, EngineError> {
        let command_line = self.command_line(args);
        tracing::debug!(command = %command_line, "Running engine command");

        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| EngineError::new(&command_line, format!("failed to spawn: {}", e)))
    }

    /// Run the engine with `args`, returning its output on success.
    async fn run(&self, args: &[&str]) -> Result<Output, EngineError> {
        let output = self.output(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::new(
                self.command_line(args),
                format!(
                    "exit {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ));
        }

        Ok(output)
    }

    fn command_line(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn image_exists(&self, name: &str) -> Result<bool, EngineError> {
        // `image ls <repo>` matches any tag; inspect resolves the exact reference.
        let output = self
            .output(&["image", "inspect", "--format", "{{.Id}}", name])
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(image = %name, stderr = %stderr.trim(), "Image not present locally");
            return Ok(false);
        }
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    async fn pull(&self, name: &str) -> Result<(), EngineError> {
        self.run(&["pull", "--quiet", name]).await?;
        Ok(())
    }

    async fn build(
        &self,
        context_dir: &Path,
        recipe: &Path,
        tag: &str,
    ) -> Result<(), EngineError> {
        let context = context_dir.to_string_lossy();
        let recipe = recipe.to_string_lossy();
        self.run(&[
            "build",
            "--file",
            recipe.as_ref(),
            "--tag",
            tag,
            context.as_ref(),
        ])
        .await?;
        Ok(())
    }

    async fn inspect(&self, image: &ImageReference) -> Result<serde_json::Value, EngineError> {
        let output = self.run(&["image", "inspect", image.as_str()]).await?;
        first_inspect_document(&output.stdout).map_err(|message| {
            EngineError::new(format!("{} image inspect {}", self.program, image), message)
        })
    }

    async fn history(&self, image: &ImageReference) -> Result<Vec<HistoryEntry>, EngineError> {
        let output = self
            .run(&[
                "history",
                "--no-trunc",
                "--human=false",
                "--format",
                "{{json .}}",
                image.as_str(),
            ])
            .await?;
        parse_history_output(&output.stdout).map_err(|message| {
            EngineError::new(format!("{} history {}", self.program, image), message)
        })
    }
}

/// `image inspect` prints a JSON array with one document per image.
fn first_inspect_document(stdout: &[u8]) -> Result<serde_json::Value, String> {
    let value: serde_json::Value =
        serde_json::from_slice(stdout).map_err(|e| format!("invalid inspect output: {}", e))?;
    match value {
        serde_json::Value::Array(mut docs) if !docs.is_empty() => Ok(docs.swap_remove(0)),
        serde_json::Value::Array(_) => Err("inspect returned no documents".to_string()),
        doc @ serde_json::Value::Object(_) => Ok(doc),
        _ => Err("inspect output is not a JSON array".to_string()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HistoryLine {
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    created_by: String,
    #[serde(default)]
    size: serde_json::Value,
    #[serde(default)]
    comment: String,
}

/// Parse `history --format '{{json .}}'` output: one JSON object per line.
fn parse_history_output(stdout: &[u8]) -> Result<Vec<HistoryEntry>, String> {
    let text = String::from_utf8_lossy(stdout);
    let mut entries = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed: HistoryLine = serde_json::from_str(line)
            .map_err(|e| format!("line {}: invalid history entry: {}", idx + 1, e))?;
        let size = match &parsed.size {
            serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
            serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        entries.push(HistoryEntry {
            created: parsed.created_at.filter(|s| !s.is_empty()),
            created_by: parsed.created_by,
            size,
            comment: parsed.comment,
        });
    }

    Ok(entries)
}
