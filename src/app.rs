// src/app.rs
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{AspectRatio, GeneratedImage, ImagePayload};
use crate::platform::{Downloader, PlatformError, ShareTarget, VoiceInput, append_transcript};
use crate::services::{GenerationError, ImageGenerator};
use crate::session::{Event, SessionState, Ticket, reduce};
use crate::view::{self, ViewState};

/// Why an intent was not carried out. Shown to the user as is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    #[error("Describe the image first.")]
    EmptyPrompt,

    #[error("An image is still being generated.")]
    Busy,

    #[error("There is no image yet.")]
    NoImage,

    #[error("History has no entry {0}.")]
    NoSuchEntry(usize),

    #[error("Voice input is not supported in this environment.")]
    VoiceUnavailable,

    #[error("Sharing is not supported in this environment.")]
    ShareUnavailable,

    #[error("Saving files is not supported in this environment.")]
    DownloadUnavailable,

    #[error("{0}")]
    Platform(#[from] PlatformError),
}

/// A submitted request waiting for its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub ticket: Ticket,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

pub type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

pub struct Platform {
    pub voice: Box<dyn VoiceInput>,
    pub downloader: Box<dyn Downloader>,
    pub share: Box<dyn ShareTarget>,
}

/// Owns the session and dispatches user intents to it.
pub struct App {
    state: SessionState,
    view: ViewState,
    generator: Arc<dyn ImageGenerator>,
    platform: Platform,
    clock: Clock,
}

impl App {
    pub fn new(generator: Arc<dyn ImageGenerator>, platform: Platform, default_ratio: AspectRatio) -> Self {
        let view = ViewState {
            selected_ratio: default_ratio,
            voice_available: platform.voice.is_available(),
            share_available: platform.share.is_available(),
            ..ViewState::default()
        };

        Self {
            state: SessionState::new(default_ratio),
            view,
            generator,
            platform,
            clock: Box::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn generator(&self) -> Arc<dyn ImageGenerator> {
        Arc::clone(&self.generator)
    }

    pub fn render(&self) -> String {
        view::render(&self.state, &self.view)
    }

    pub fn history_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&view::history_entries(&self.state))
    }

    fn dispatch(&mut self, event: Event) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.view.draft = text.into();
    }

    pub fn select_ratio(&mut self, ratio: AspectRatio) -> Result<(), Refusal> {
        if !self.state.accepts_submit() {
            return Err(Refusal::Busy);
        }
        self.view.selected_ratio = ratio;
        Ok(())
    }

    /// Moves the session to generating for the current draft. The caller
    /// runs the generator and reports back through [`App::finish_generation`].
    pub fn begin_generation(&mut self) -> Result<PendingGeneration, Refusal> {
        let prompt = self.view.draft.trim().to_string();
        if prompt.is_empty() {
            return Err(Refusal::EmptyPrompt);
        }
        if !self.state.accepts_submit() {
            return Err(Refusal::Busy);
        }

        let aspect_ratio = self.view.selected_ratio;
        self.dispatch(Event::Submit {
            ratio: aspect_ratio,
        });
        let ticket = self.state.pending.ok_or(Refusal::Busy)?;
        self.view.fullscreen = false;

        info!("Request {} submitted ({}): {}", ticket, aspect_ratio, prompt);
        Ok(PendingGeneration {
            ticket,
            prompt,
            aspect_ratio,
        })
    }

    pub fn finish_generation(
        &mut self,
        pending: PendingGeneration,
        result: Result<ImagePayload, GenerationError>,
    ) {
        match result {
            Ok(payload) => {
                let timestamp = self.state.next_timestamp((self.clock)());
                let image = GeneratedImage::new(payload, pending.prompt, pending.aspect_ratio, timestamp);
                self.dispatch(Event::Completed {
                    ticket: pending.ticket,
                    image,
                });
            }
            Err(err) => {
                error!(
                    "Request {} failed after {} attempt(s): {}",
                    pending.ticket, err.attempts, err.kind
                );
                self.dispatch(Event::Failed {
                    ticket: pending.ticket,
                    message: err.user_message,
                });
            }
        }
    }

    /// Submits the draft and waits for the result.
    pub async fn generate(&mut self) -> Result<(), Refusal> {
        let pending = self.begin_generation()?;
        let result = self
            .generator
            .generate(&pending.prompt, pending.aspect_ratio)
            .await;
        self.finish_generation(pending, result);
        Ok(())
    }

    /// Shows the n-th history entry (1-based, oldest first).
    pub fn pick_history(&mut self, index: usize) -> Result<(), Refusal> {
        let timestamp = index
            .checked_sub(1)
            .and_then(|i| self.state.history.get(i))
            .map(|img| img.timestamp())
            .ok_or(Refusal::NoSuchEntry(index))?;
        self.dispatch(Event::SelectHistory { timestamp });
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        if self.state.current_image.is_none() {
            self.view.fullscreen = false;
            return false;
        }
        self.view.fullscreen = !self.view.fullscreen;
        self.view.fullscreen
    }

    pub async fn dictate(&mut self) -> Result<(), Refusal> {
        if !self.platform.voice.is_available() {
            return Err(Refusal::VoiceUnavailable);
        }
        let transcript = self.platform.voice.listen().await?;
        self.view.draft = append_transcript(&self.view.draft, &transcript);
        Ok(())
    }

    pub async fn download(&self) -> Result<PathBuf, Refusal> {
        let image = self.state.current_image.as_ref().ok_or(Refusal::NoImage)?;
        if !self.platform.downloader.is_available() {
            return Err(Refusal::DownloadUnavailable);
        }
        Ok(self.platform.downloader.save(image).await?)
    }

    pub async fn share(&self) -> Result<(), Refusal> {
        let image = self.state.current_image.as_ref().ok_or(Refusal::NoImage)?;
        if !self.platform.share.is_available() {
            return Err(Refusal::ShareUnavailable);
        }
        Ok(self.platform.share.share(image).await?)
    }
}
