// src/services/generation.rs
use async_trait::async_trait;
use log::{error, info, warn};
use std::time::Duration;
use thiserror::Error;

use crate::models::{AspectRatio, ImagePayload};
use crate::services::classify::{ErrorKind, classify};
use crate::services::gemini::{GenerateContentResponse, GenerationRequest, ImageBackend};

pub const PROMPT_SUFFIX: &str = ", high quality, HD, 4k, highly detailed, photorealistic";

/// The one error a generation surfaces. Its `Display` is the message shown
/// to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{user_message}")]
pub struct GenerationError {
    pub kind: ErrorKind,
    /// Remote calls made before giving up.
    pub attempts: u32,
    pub user_message: String,
}

impl GenerationError {
    pub fn new(kind: ErrorKind, attempts: u32) -> Self {
        let user_message = kind.user_message();
        Self {
            kind,
            attempts,
            user_message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Wait before the retry that follows failed attempt `attempt` (1-based):
    /// base, 2×base, 4×base...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Anything that turns a prompt into an image payload. Implemented by
/// [`GenerationClient`]; the presentation layer only sees this trait.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, GenerationError>;
}

pub fn enhance_prompt(prompt: &str) -> String {
    format!("{}{}", prompt.trim(), PROMPT_SUFFIX)
}

pub struct GenerationClient<B, S = TokioSleeper> {
    backend: B,
    sleeper: S,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl<B: ImageBackend> GenerationClient<B, TokioSleeper> {
    pub fn new(backend: B, api_key: Option<String>, retry: RetryPolicy) -> Self {
        Self::with_sleeper(backend, TokioSleeper, api_key, retry)
    }
}

impl<B: ImageBackend, S: Sleeper> GenerationClient<B, S> {
    pub fn with_sleeper(backend: B, sleeper: S, api_key: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            sleeper,
            api_key,
            retry,
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                error!("Generation aborted: no API key configured");
                GenerationError::new(ErrorKind::MissingCredential, 0)
            })?;

        let enhanced = enhance_prompt(prompt);
        let request = GenerationRequest {
            api_key,
            prompt: &enhanced,
            aspect_ratio,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            info!("Generating image (attempt {}/{}, {})", attempt, self.retry.max_attempts, aspect_ratio);

            let kind = match self.backend.generate_content(&request).await {
                Ok(response) => match extract_image(&response) {
                    Ok(payload) => return Ok(payload),
                    Err(kind) => kind,
                },
                Err(remote) => {
                    let kind = classify(&remote);
                    warn!(
                        "Attempt {} failed ({}): status={:?} {}",
                        attempt, kind, remote.status, remote.message
                    );
                    kind
                }
            };

            if !kind.is_retryable() || attempt >= self.retry.max_attempts {
                error!("Image generation failed after {} attempt(s): {}", attempt, kind);
                return Err(GenerationError::new(kind, attempt));
            }

            let delay = self.retry.delay_after(attempt);
            warn!("Rate limited, retrying in {}ms", delay.as_millis());
            self.sleeper.sleep(delay).await;
        }
    }
}

#[async_trait]
impl<B: ImageBackend, S: Sleeper> ImageGenerator for GenerationClient<B, S> {
    async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, GenerationError> {
        GenerationClient::generate(self, prompt, aspect_ratio).await
    }
}

/// Pulls the first inline image out of a response, telling an explicit
/// safety block apart from a plain empty result.
pub fn extract_image(response: &GenerateContentResponse) -> Result<ImagePayload, ErrorKind> {
    if let Some(payload) = response.first_image() {
        return Ok(payload);
    }

    match response.block_reason() {
        Some(reason) => {
            warn!("Generation blocked: {}", reason);
            Err(ErrorKind::SafetyBlocked)
        }
        None => {
            if let Some(text) = response.text() {
                warn!("No image data in response, model said: {}", text);
            }
            Err(ErrorKind::EmptyResult)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gemini::Part;

    #[test]
    fn prompt_gets_quality_suffix() {
        assert_eq!(
            enhance_prompt("a cat in a hat "),
            "a cat in a hat, high quality, HD, 4k, highly detailed, photorealistic"
        );
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(8000));
    }

    #[test]
    fn extract_distinguishes_block_from_empty() {
        assert_eq!(
            extract_image(&GenerateContentResponse::blocked("SAFETY")),
            Err(ErrorKind::SafetyBlocked)
        );
        assert_eq!(
            extract_image(&GenerateContentResponse::from_parts(vec![Part::text("sorry")])),
            Err(ErrorKind::EmptyResult)
        );
        assert_eq!(
            extract_image(&GenerateContentResponse::default()),
            Err(ErrorKind::EmptyResult)
        );
    }

    #[test]
    fn error_displays_user_message() {
        let err = GenerationError::new(ErrorKind::RateLimited, 3);
        assert_eq!(err.to_string(), ErrorKind::RateLimited.user_message());
        assert_eq!(err.attempts, 3);
    }
}
