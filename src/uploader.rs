//! Upload collaborator seam.
//!
//! The transport to an actual image host lives behind [`Uploader`]; the core
//! only depends on the positional contract: one URL per requested image, in
//! order. [`CommandUploader`] is the CLI's backend, delegating to an external
//! command (a PicGo-style CLI, a custom script, ...) that prints the result
//! as JSON.

use std::path::PathBuf;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::config::Settings;

/// One upload candidate. `source` is the literal original snippet for the
/// single-document legacy matcher; the batch path synthesizes the canonical
/// inline form for the file's own vault-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub name: String,
    pub source: String,
}

/// Result of one bulk upload. `result` is positionally aligned with the
/// input image list; the coordinator verifies that, never assumes it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadOutcome {
    pub success: bool,
    #[serde(default)]
    pub result: Vec<String>,
}

#[async_trait]
pub trait Uploader {
    async fn upload(&self, images: &[ImageRef]) -> anyhow::Result<UploadOutcome>;
}

/// Runs `settings.upload_command` with the image paths appended as
/// arguments, expecting `{"success": bool, "result": ["url", ...]}` on
/// stdout.
pub struct CommandUploader {
    command: String,
    url_suffix: String,
}

impl CommandUploader {
    pub fn new(settings: &Settings) -> CommandUploader {
        CommandUploader {
            command: settings.upload_command.clone(),
            url_suffix: settings.url_suffix.clone(),
        }
    }
}

#[async_trait]
impl Uploader for CommandUploader {
    async fn upload(&self, images: &[ImageRef]) -> anyhow::Result<UploadOutcome> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("no upload command configured"))?;

        debug!(command = %self.command, images = images.len(), "invoking upload command");
        let output = Command::new(program)
            .args(parts)
            .args(images.iter().map(|image| image.path.as_os_str()))
            .output()
            .await?;

        if !output.status.success() {
            bail!("upload command exited with {}", output.status);
        }

        let mut outcome: UploadOutcome = serde_json::from_slice(&output.stdout)?;
        if !self.url_suffix.is_empty() {
            for url in &mut outcome.result {
                url.push_str(&self.url_suffix);
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_uploader_parses_json_stdout() {
        let settings = Settings {
            upload_command: r#"echo {"success":true,"result":[]}"#.to_string(),
            ..Default::default()
        };
        let uploader = CommandUploader::new(&settings);

        let outcome = uploader.upload(&[]).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.result.is_empty());
    }

    #[tokio::test]
    async fn test_command_uploader_requires_command() {
        let uploader = CommandUploader::new(&Settings::default());
        assert!(uploader.upload(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_command_uploader_appends_url_suffix() {
        let settings = Settings {
            upload_command: r#"echo {"success":true,"result":["https://host/x.png"]}"#.to_string(),
            url_suffix: "!thumb".to_string(),
            ..Default::default()
        };
        let uploader = CommandUploader::new(&settings);

        let outcome = uploader.upload(&[]).await.unwrap();
        assert_eq!(outcome.result, vec!["https://host/x.png!thumb"]);
    }
}
