use std::fs;
use std::io;
use std::path::Path;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use prodigy_contracts::upload::ImageFormat;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::SolverConfig;
use crate::error::ModelInvocationError;
use crate::providers::{ModelRequest, SolverModel};

/// Smallest longest-side bound a screenshot is scaled to.
const MIN_IMAGE_DIM: u32 = 64;
const ERROR_BODY_CHARS: usize = 512;
const JPEG_QUALITY: u8 = 90;

/// Ways a call to the Responses API can fail.
#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("failed reading the staged screenshot {path}: {source}")]
    Screenshot {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("OpenAI request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("OpenAI rejected the request (HTTP {status}): {body}")]
    Status { status: u16, body: String },
    #[error("OpenAI returned invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("OpenAI response contained no output text")]
    NoOutputText,
}

impl From<OpenAiError> for ModelInvocationError {
    fn from(err: OpenAiError) -> Self {
        Self::new(err.to_string())
    }
}

/// Hosted solver behind the OpenAI Responses API.
pub struct OpenAiVisionModel {
    api_base: String,
    max_output_tokens: u64,
    max_image_dim: u32,
    http: HttpClient,
}

impl OpenAiVisionModel {
    pub fn new(config: &SolverConfig) -> anyhow::Result<Self> {
        // The blocking client defaults to a 30s timeout; solving has none
        // unless one is configured.
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build OpenAI HTTP client")?;
        Ok(Self {
            api_base: config.api_base.clone(),
            max_output_tokens: config.max_output_tokens,
            max_image_dim: config.max_image_dim,
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.api_base)
    }

    fn request_payload(&self, request: &ModelRequest<'_>) -> Result<Value, OpenAiError> {
        let screenshot = fs::read(request.image_path).map_err(|source| OpenAiError::Screenshot {
            path: request.image_path.display().to_string(),
            source,
        })?;
        let data_url = screenshot_data_url(&screenshot, request.image_format, self.max_image_dim);
        Ok(json!({
            "model": request.model,
            "instructions": request.prompt.instructions,
            "input": [{
                "role": "user",
                "content": [
                    {"type": "input_text", "text": request.prompt.text},
                    {"type": "input_image", "image_url": data_url},
                ],
            }],
            "max_output_tokens": self.max_output_tokens,
        }))
    }

    fn post(&self, request: &ModelRequest<'_>) -> Result<String, OpenAiError> {
        let payload = self.request_payload(request)?;
        let endpoint = self.endpoint();
        tracing::debug!(%endpoint, model = request.model, "posting OpenAI vision request");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(request.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .map_err(OpenAiError::Transport)?;
        let reply = read_reply(response)?;
        if let Some((input_tokens, output_tokens)) = extract_token_usage(&reply) {
            tracing::debug!(input_tokens, output_tokens, "OpenAI token usage");
        }
        let text = extract_solution_text(&reply);
        if text.trim().is_empty() {
            return Err(OpenAiError::NoOutputText);
        }
        Ok(text)
    }
}

impl SolverModel for OpenAiVisionModel {
    fn name(&self) -> &str {
        "openai"
    }

    fn solve(&self, request: &ModelRequest<'_>) -> Result<String, ModelInvocationError> {
        self.post(request).map_err(ModelInvocationError::from)
    }
}

fn read_reply(response: HttpResponse) -> Result<Value, OpenAiError> {
    let status = response.status();
    let body = response.text().map_err(OpenAiError::Transport)?;
    if !status.is_success() {
        return Err(OpenAiError::Status {
            status: status.as_u16(),
            body: body_excerpt(&body),
        });
    }
    serde_json::from_str(&body).map_err(OpenAiError::InvalidJson)
}

fn body_excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

/// Inline data URL for the screenshot.
///
/// Decodable screenshots are flattened onto white, bounded to `max_dim`
/// on the longest side and re-encoded as JPEG. Anything else is sent as
/// uploaded.
pub(crate) fn screenshot_data_url(bytes: &[u8], format: ImageFormat, max_dim: u32) -> String {
    let (encoded, mime) = match reencode_screenshot(bytes, format, max_dim.max(MIN_IMAGE_DIM)) {
        Some(jpeg) => (BASE64.encode(jpeg), ImageFormat::Jpeg.mime()),
        None => {
            tracing::debug!(format = format.extension(), "sending screenshot bytes unchanged");
            (BASE64.encode(bytes), format.mime())
        }
    };
    format!("data:{mime};base64,{encoded}")
}

fn reencode_screenshot(bytes: &[u8], format: ImageFormat, max_dim: u32) -> Option<Vec<u8>> {
    let decoder_format = match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
    };
    let decoded = image::load_from_memory_with_format(bytes, decoder_format).ok()?;
    let mut page = RgbaImage::from_pixel(
        decoded.width(),
        decoded.height(),
        Rgba([255, 255, 255, 255]),
    );
    imageops::overlay(&mut page, &decoded.to_rgba8(), 0, 0);
    let mut page = DynamicImage::ImageRgba8(page);
    if page.width() > max_dim || page.height() > max_dim {
        page = page.resize(max_dim, max_dim, FilterType::Triangle);
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&page.to_rgb8())
        .ok()?;
    Some(jpeg)
}

/// Solution text from a Responses API reply, kept exactly as generated.
///
/// Prefers the `output_text` convenience field and otherwise concatenates
/// the `output_text` parts of every message.
pub(crate) fn extract_solution_text(reply: &Value) -> String {
    if let Some(text) = reply.get("output_text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return text.to_string();
        }
    }

    let mut messages: Vec<String> = Vec::new();
    for item in reply
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let text: String = item
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if !text.trim().is_empty() {
            messages.push(text);
        }
    }
    messages.join("\n\n")
}

fn extract_token_usage(reply: &Value) -> Option<(u64, u64)> {
    let usage = reply.get("usage")?;
    Some((
        usage.get("input_tokens")?.as_u64()?,
        usage.get("output_tokens")?.as_u64()?,
    ))
}
