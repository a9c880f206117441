// src/platform/mod.rs
//! Capabilities that depend on the environment the session runs in: voice
//! dictation, saving a file, handing an image to the system share action.
//! Each is probed with `is_available` before the presentation layer offers
//! the corresponding control.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::GeneratedImage;

pub mod command;
pub mod download;

pub use command::{CommandShare, CommandVoiceInput};
pub use download::FileDownloader;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("{0} is not available in this environment")]
    Unavailable(&'static str),

    #[error("{0} was cancelled")]
    Cancelled(&'static str),

    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait VoiceInput: Send + Sync {
    fn is_available(&self) -> bool;

    /// Listens once and returns the transcript.
    async fn listen(&self) -> Result<String, PlatformError>;
}

#[async_trait]
pub trait Downloader: Send + Sync {
    fn is_available(&self) -> bool;

    async fn save(&self, image: &GeneratedImage) -> Result<PathBuf, PlatformError>;
}

#[async_trait]
pub trait ShareTarget: Send + Sync {
    fn is_available(&self) -> bool;

    async fn share(&self, image: &GeneratedImage) -> Result<(), PlatformError>;
}

/// Appends a dictated transcript to the draft prompt, space separated.
pub fn append_transcript(draft: &str, transcript: &str) -> String {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return draft.to_string();
    }
    if draft.trim().is_empty() {
        transcript.to_string()
    } else {
        format!("{} {}", draft.trim_end(), transcript)
    }
}

pub fn download_file_name(image: &GeneratedImage) -> String {
    format!(
        "generated-image-{}.{}",
        image.timestamp(),
        image.payload().file_extension()
    )
}

pub fn share_caption(image: &GeneratedImage) -> String {
    format!("Created with Imagine: {}", image.prompt())
}
