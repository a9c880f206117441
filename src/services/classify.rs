// src/services/classify.rs
//! Maps every generation failure onto one [`ErrorKind`] and one fixed
//! user-facing message. Kept free of I/O and timing so the rules can be
//! tuned without touching the retry loop.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Failure reported by the remote generation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::new(Some(status), body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    MissingCredential,
    InvalidCredential,
    PermissionDenied,
    RateLimited,
    SafetyBlocked,
    EmptyResult,
    /// Structured service error; holds the message it carried.
    Service(String),
    Unknown,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RateLimited)
    }

    pub fn user_message(&self) -> String {
        match self {
            ErrorKind::MissingCredential => {
                "API key is missing. Set GEMINI_API_KEY in your environment.".to_string()
            }
            ErrorKind::InvalidCredential => {
                "The API key is invalid or has been revoked. Check your configuration.".to_string()
            }
            ErrorKind::PermissionDenied => {
                "This API key has no access to the image generation model.".to_string()
            }
            ErrorKind::RateLimited => {
                "Request quota exhausted. Wait a minute and try again.".to_string()
            }
            ErrorKind::SafetyBlocked => {
                "The request was blocked by safety filters. Try rephrasing the description."
                    .to_string()
            }
            ErrorKind::EmptyResult => {
                "The service returned no image. Try a different description.".to_string()
            }
            ErrorKind::Service(message) => format!("Service error: {}", message),
            ErrorKind::Unknown => "Image generation failed. Please try again.".to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingCredential => f.write_str("missing_credential"),
            ErrorKind::InvalidCredential => f.write_str("invalid_credential"),
            ErrorKind::PermissionDenied => f.write_str("permission_denied"),
            ErrorKind::RateLimited => f.write_str("rate_limited"),
            ErrorKind::SafetyBlocked => f.write_str("safety_blocked"),
            ErrorKind::EmptyResult => f.write_str("empty_result"),
            ErrorKind::Service(_) => f.write_str("service"),
            ErrorKind::Unknown => f.write_str("unknown"),
        }
    }
}

/// Classifies a remote failure. Checks run in priority order and the first
/// match wins, so an error mentioning both a bad key and a quota is a
/// credential error.
pub fn classify(error: &RemoteError) -> ErrorKind {
    let lower = error.message.to_lowercase();

    if error.status == Some(401)
        || error.message.contains("API_KEY_INVALID")
        || lower.contains("api key not valid")
        || lower.contains("api key expired")
    {
        return ErrorKind::InvalidCredential;
    }

    if error.status == Some(403) || error.message.contains("PERMISSION_DENIED") {
        return ErrorKind::PermissionDenied;
    }

    if error.status == Some(429)
        || error.message.contains("RESOURCE_EXHAUSTED")
        || lower.contains("quota")
        || lower.contains("rate limit")
    {
        return ErrorKind::RateLimited;
    }

    if lower.contains("safety") || lower.contains("blocked") {
        return ErrorKind::SafetyBlocked;
    }

    if let Some(message) = embedded_error_message(&error.message) {
        return ErrorKind::Service(message);
    }

    ErrorKind::Unknown
}

/// Finds the first JSON object inside `text` that carries an error message,
/// e.g. `{"error":{"code":500,"message":"..."}}` after a text prefix.
pub fn embedded_error_message(text: &str) -> Option<String> {
    text.match_indices('{').find_map(|(start, _)| {
        let value = serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()?
            .ok()?;
        message_field(&value)
    })
}

fn message_field(value: &Value) -> Option<String> {
    let candidate = value["error"]["message"]
        .as_str()
        .or_else(|| value["message"].as_str())
        .or_else(|| value["error"].as_str())?;

    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
