use crate::base::{Config, IxError, IxResult};
use rocket::serde::{Deserialize, Serialize};
use slog_scope::warn;
use std::time::Duration;

const EXTRACT_INSTRUCTION: &str = "Read this invoice and return a JSON object with exactly two \
fields: \"supplier_name\" (string) and \"total_amount\" (number). Respond with the bare JSON \
object only, no markdown fences and no commentary. Use null for any field you cannot determine.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub supplier_name: Option<String>,
    pub total_amount: Option<f64>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Success,
    Degraded,
}

impl ExtractionResult {
    pub fn degraded() -> ExtractionResult {
        ExtractionResult {
            supplier_name: None,
            total_amount: None,
            confidence: Confidence::Degraded,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProposedFields {
    pub supplier_name: Option<String>,
    pub total_amount: Option<f64>,
}

#[derive(Deserialize)]
struct GenerateReply {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct Extractor {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl Extractor {
    pub fn from_config(config: &Config) -> Extractor {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.extract_timeout_secs))
            .build()
            .expect("extraction http client");
        Extractor {
            http,
            api_key: config.extract_api_key.clone(),
            model: config.extract_model.clone(),
            base_url: String::from(config.extract_base_url.trim_end_matches('/')),
        }
    }

    // Never fails the ingest: any transport, quota or parse problem collapses
    // into a degraded result and the caller falls back on validation.
    pub async fn extract(&self, bytes: &[u8], content_type: &str) -> ExtractionResult {
        match self.propose(bytes, content_type).await {
            Ok(fields) => ExtractionResult {
                supplier_name: fields.supplier_name,
                total_amount: fields.total_amount,
                confidence: Confidence::Success,
            },
            Err(e) => {
                warn!("field extraction degraded"; "error" => %e);
                ExtractionResult::degraded()
            }
        }
    }

    async fn propose(&self, bytes: &[u8], content_type: &str) -> IxResult<ProposedFields> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            IxError::ExtractionUnavailable(String::from("no extraction API key configured"))
        })?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": EXTRACT_INSTRUCTION },
                    { "inline_data": { "mime_type": content_type, "data": base64::encode(bytes) } }
                ]
            }],
            "generationConfig": { "temperature": 0 }
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| IxError::ExtractionUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IxError::ExtractionUnavailable(format!("unreadable reply: {}", e)))?;
        if !status.is_success() {
            return Err(IxError::ExtractionUnavailable(format!(
                "model endpoint returned {}: {}",
                status, text
            )));
        }

        let reply: GenerateReply = serde_json::from_str(&text)
            .map_err(|e| IxError::ExtractionUnavailable(format!("unexpected reply shape: {}", e)))?;
        let content = reply_text(reply).ok_or_else(|| {
            IxError::ExtractionUnavailable(String::from("reply carries no text content"))
        })?;
        parse_reply(&content).ok_or_else(|| {
            IxError::ExtractionUnavailable(format!("unparseable model reply: {}", content))
        })
    }
}

fn reply_text(reply: GenerateReply) -> Option<String> {
    reply
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts?
        .into_iter()
        .find_map(|p| p.text)
}

// Models fence their answers in markdown no matter how firmly the prompt says
// not to, so one layer of ``` or ```json wrapping is tolerated.
pub fn parse_reply(text: &str) -> Option<ProposedFields> {
    serde_json::from_str(strip_code_fence(text).trim()).ok()
}

pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest)
        }
        None => trimmed,
    }
}
