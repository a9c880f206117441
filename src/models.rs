// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ImagineError;

pub const DEFAULT_MIME_TYPE: &str = "image/png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    Tall,
}

impl AspectRatio {
    /// Order in which the ratio selector offers the choices.
    pub const SELECTOR: [AspectRatio; 5] = [
        AspectRatio::Landscape,
        AspectRatio::Classic,
        AspectRatio::Square,
        AspectRatio::Tall,
        AspectRatio::Portrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Classic => "4:3",
            AspectRatio::Tall => "3:4",
        }
    }

    /// Width and height proportions, e.g. `(16, 9)`.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Landscape => (16, 9),
            AspectRatio::Portrait => (9, 16),
            AspectRatio::Classic => (4, 3),
            AspectRatio::Tall => (3, 4),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ImagineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        AspectRatio::SELECTOR
            .into_iter()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| ImagineError::Validation(format!("Unsupported aspect ratio: {}", s)))
    }
}

/// Image bytes as handed back by the generation service: a media type and
/// the base64 text of the encoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, general_purpose::STANDARD.encode(bytes))
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn parse_data_uri(uri: &str) -> Result<Self, ImagineError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ImagineError::Validation("Not a data URI".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| ImagineError::Validation("Data URI has no payload".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImagineError::Validation("Data URI is not base64".to_string()))?;

        let mime_type = if mime_type.is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            mime_type
        };

        Ok(Self::new(mime_type, data))
    }

    pub fn decode(&self) -> Result<Vec<u8>, ImagineError> {
        general_purpose::STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| ImagineError::ImageProcessing(format!("Failed to decode image: {}", e)))
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

/// One successful generation. Never mutated after construction; the
/// timestamp doubles as its identity within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    payload: ImagePayload,
    prompt: String,
    aspect_ratio: AspectRatio,
    timestamp: i64,
}

impl GeneratedImage {
    pub fn new(
        payload: ImagePayload,
        prompt: impl Into<String>,
        aspect_ratio: AspectRatio,
        timestamp: i64,
    ) -> Self {
        Self {
            payload,
            prompt: prompt.into(),
            aspect_ratio,
            timestamp,
        }
    }

    pub fn payload(&self) -> &ImagePayload {
        &self.payload
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn url(&self) -> String {
        self.payload.data_uri()
    }
}
