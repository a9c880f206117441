// src/services/gemini.rs
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::models::{AspectRatio, DEFAULT_MIME_TYPE, ImagePayload};
use crate::services::classify::RemoteError;

/// Finish reasons the service uses when it withheld output on policy grounds.
const SAFETY_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

/// One call to the remote generator, prompt already enhanced.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub api_key: &'a str,
    pub prompt: &'a str,
    pub aspect_ratio: AspectRatio,
}

#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate_content(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GenerateContentResponse, RemoteError>;
}

pub struct GeminiBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

pub fn request_body(prompt: &str, aspect_ratio: AspectRatio) -> serde_json::Value {
    json!({
        "contents": [{
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": { "aspectRatio": aspect_ratio.as_str() }
        }
    })
}

#[async_trait]
impl ImageBackend for GeminiBackend {
    async fn generate_content(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GenerateContentResponse, RemoteError> {
        debug!("POST {} ({})", self.endpoint(), request.aspect_ratio);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", request.api_key)
            .json(&request_body(request.prompt, request.aspect_ratio))
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RemoteError::http(status.as_u16(), error_text));
        }

        response.json::<GenerateContentResponse>().await.map_err(|e| {
            RemoteError::transport(format!("Failed to parse Gemini response: {}", e))
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.map(str::to_string),
                data: Some(data.into()),
            }),
        }
    }
}

impl GenerateContentResponse {
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: Some(vec![Candidate {
                content: Some(Content { parts: Some(parts) }),
                finish_reason: Some("STOP".to_string()),
            }]),
            prompt_feedback: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            candidates: None,
            prompt_feedback: Some(PromptFeedback {
                block_reason: Some(reason.into()),
            }),
        }
    }

    /// Parts of the first candidate, in order.
    pub fn parts(&self) -> &[Part] {
        self.candidates
            .as_ref()
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.as_deref())
            .unwrap_or(&[])
    }

    /// First part carrying inline image data, as a payload.
    pub fn first_image(&self) -> Option<ImagePayload> {
        self.parts().iter().find_map(|part| {
            let inline = part.inline_data.as_ref()?;
            let data = inline.data.as_deref().filter(|d| !d.is_empty())?;
            let mime_type = inline
                .mime_type
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_MIME_TYPE);
            Some(ImagePayload::new(mime_type, data))
        })
    }

    /// Why the service withheld output, if it says so.
    pub fn block_reason(&self) -> Option<&str> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Some(reason);
        }

        self.candidates
            .as_ref()?
            .iter()
            .filter_map(|candidate| candidate.finish_reason.as_deref())
            .find(|reason| SAFETY_FINISH_REASONS.contains(reason))
    }

    /// Text the model returned alongside (or instead of) an image.
    pub fn text(&self) -> Option<String> {
        let text: Vec<&str> = self
            .parts()
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text.join("\n"))
        }
    }
}
