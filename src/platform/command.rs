// src/platform/command.rs
//! Capabilities backed by user-configured external programs, e.g. a
//! speech-to-text tool for dictation or `xdg-open` for sharing.

use async_trait::async_trait;
use log::{debug, info};
use std::io::Write;
use tokio::process::Command;

use crate::models::GeneratedImage;
use crate::platform::{PlatformError, ShareTarget, VoiceInput, share_caption};

pub const SHARE_TEXT_VAR: &str = "IMAGINE_SHARE_TEXT";

fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut words = command.split_whitespace().map(str::to_string);
    let program = words.next()?;
    Some((program, words.collect()))
}

/// Dictation through an external program that records speech and prints
/// the transcript on stdout.
pub struct CommandVoiceInput {
    command: Option<String>,
}

impl CommandVoiceInput {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }
}

#[async_trait]
impl VoiceInput for CommandVoiceInput {
    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    async fn listen(&self) -> Result<String, PlatformError> {
        let (program, args) = self
            .command
            .as_deref()
            .and_then(split_command)
            .ok_or(PlatformError::Unavailable("Voice input"))?;

        debug!("Running voice command: {} {:?}", program, args);
        let output = Command::new(&program)
            .args(&args)
            .output()
            .await
            .map_err(|e| PlatformError::Failed(format!("Failed to start {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlatformError::Failed(format!(
                "Voice command exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            return Err(PlatformError::Cancelled("Voice input"));
        }
        Ok(transcript)
    }
}

/// Shares an image by writing it to a kept temporary file and handing the
/// path to an opener program. The caption goes in `IMAGINE_SHARE_TEXT`.
pub struct CommandShare {
    command: Option<String>,
}

impl CommandShare {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }
}

#[async_trait]
impl ShareTarget for CommandShare {
    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    async fn share(&self, image: &GeneratedImage) -> Result<(), PlatformError> {
        let (program, args) = self
            .command
            .as_deref()
            .and_then(split_command)
            .ok_or(PlatformError::Unavailable("Sharing"))?;

        let bytes = image
            .payload()
            .decode()
            .map_err(|e| PlatformError::Failed(e.to_string()))?;

        let mut file = tempfile::Builder::new()
            .prefix("imagine-")
            .suffix(&format!(".{}", image.payload().file_extension()))
            .tempfile()
            .map_err(|e| PlatformError::Failed(format!("Failed to create share file: {}", e)))?;
        file.write_all(&bytes)
            .map_err(|e| PlatformError::Failed(format!("Failed to write share file: {}", e)))?;
        let (_, path) = file
            .keep()
            .map_err(|e| PlatformError::Failed(format!("Failed to keep share file: {}", e)))?;

        let status = Command::new(&program)
            .args(&args)
            .arg(&path)
            .env(SHARE_TEXT_VAR, share_caption(image))
            .status()
            .await
            .map_err(|e| PlatformError::Failed(format!("Failed to start {}: {}", program, e)))?;

        if !status.success() {
            return Err(PlatformError::Failed(format!(
                "Share command exited with {}",
                status
            )));
        }

        info!("Shared {}", path.display());
        Ok(())
    }
}
