use base64::Engine as _;
use base64::engine::general_purpose;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::ExtractionError;
use super::partial::PartialInvoice;
use crate::config::ExtractionSettings;
use crate::model::{BankField, TopField};

/// Turns one invoice image into a partial document. One call, one attempt.
pub trait Extractor: Send + Sync {
    fn extract(&self, image: &ImageUpload) -> Result<PartialInvoice, ExtractionError>;
}

/// An image file read fully into memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = fs::read(path).map_err(|source| ExtractionError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(ImageUpload {
            mime_type: mime_type_for(path).to_string(),
            bytes,
        })
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "image/jpeg",
    }
}

/// Gemini `generateContent` with a JSON response schema.
pub struct GeminiExtractor {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    prompt: String,
}

impl GeminiExtractor {
    pub fn new(settings: &ExtractionSettings, api_key: String) -> Self {
        GeminiExtractor {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            prompt: settings.prompt.clone(),
        }
    }

    /// Reads the API key from the environment variable named in the settings.
    pub fn from_settings(settings: &ExtractionSettings) -> Result<Self, ExtractionError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExtractionError::MissingApiKey(settings.api_key_env.clone()))?;
        Ok(GeminiExtractor::new(settings, api_key))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, image: &ImageUpload) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": image.mime_type, "data": image.to_base64() } },
                    { "text": self.prompt }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema()
            }
        })
    }
}

impl Extractor for GeminiExtractor {
    fn extract(&self, image: &ImageUpload) -> Result<PartialInvoice, ExtractionError> {
        info!(
            model = %self.model,
            mime_type = %image.mime_type,
            bytes = image.bytes.len(),
            "Sending invoice image for extraction"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(image))
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::Status { status, body });
        }

        let raw = response.text()?;
        let text = reply_text(&raw)?;
        debug!(reply_len = text.len(), "Extraction reply received");
        PartialInvoice::from_json_str(&text)
    }
}

/// Schema of the reply: the document shape without item ids.
fn response_schema() -> Value {
    let string = || json!({ "type": "STRING" });

    let mut properties: Map<String, Value> = TopField::ALL
        .iter()
        .map(|f| (f.key().to_string(), string()))
        .collect();

    let bank: Map<String, Value> = BankField::ALL
        .iter()
        .map(|f| (f.key().to_string(), string()))
        .collect();
    properties.insert(
        "bankDetails".into(),
        json!({ "type": "OBJECT", "properties": bank }),
    );
    properties.insert(
        "items".into(),
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "description": { "type": "STRING" },
                    "qty": { "type": "NUMBER" },
                    "unitPrice": { "type": "NUMBER" }
                }
            }
        }),
    );

    json!({ "type": "OBJECT", "properties": properties })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenated text parts of the first candidate; empty when there is none.
fn reply_text(raw: &str) -> Result<String, ExtractionError> {
    let envelope: GenerateContentResponse = serde_json::from_str(raw)
        .map_err(|e| ExtractionError::Parse(format!("unexpected response envelope: {e}")))?;
    let text = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();
    Ok(text)
}
