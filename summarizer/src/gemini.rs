use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde_json::Value;
use std::fs;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    /// `None` when no API key is configured.
    pub fn from_env() -> Result<Option<Self>> {
        let api_key = match std::env::var("GOOGLE_GEMINI_API_KEY") {
            Ok(k) if !k.trim().is_empty() => Some(k.trim().to_string()),
            _ => read_key_file(),
        };
        let Some(api_key) = api_key else {
            return Ok(None);
        };
        let model = std::env::var("GEMINI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let temperature = match std::env::var("GEMINI_TEMPERATURE") {
            Ok(raw) => raw
                .trim()
                .parse::<f32>()
                .with_context(|| format!("invalid GEMINI_TEMPERATURE: {raw}"))?,
            Err(_) => DEFAULT_TEMPERATURE,
        };
        Ok(Some(Self {
            http: Client::new(),
            api_key,
            model,
            temperature,
        }))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let res = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt, self.temperature))
            .send()
            .await
            .context("send generateContent request")?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            bail!("Gemini call failed: {} - {}", status, text);
        }

        let json: Value = res.json().await.context("decode generateContent response")?;
        response_text(&json)
    }
}

fn request_body(prompt: &str, temperature: f32) -> Value {
    serde_json::json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        "generationConfig": {"temperature": temperature},
    })
}

/// Concatenated text of the first candidate's parts.
fn response_text(json: &Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .context("response has no candidate content")?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        bail!("Gemini returned no text");
    }
    Ok(text)
}

fn read_key_file() -> Option<String> {
    let candidates = ["~/.config/gemini/api_key", "~/.config/gemini/key"];
    for path in candidates {
        let expanded = shellexpand::tilde(path).into_owned();
        if let Ok(content) = fs::read_to_string(&expanded) {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}
