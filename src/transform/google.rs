use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{TextTranslator, TranslateFuture};

pub const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleTranslate {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        if !endpoint.trim().is_empty() {
            self.endpoint = endpoint;
        }
        self
    }
}

impl TextTranslator for GoogleTranslate {
    fn translate(&self, text: String, target_language: &str) -> TranslateFuture {
        let this = self.clone();
        let target_language = target_language.to_string();
        Box::pin(async move {
            let body = json!({
                "q": text,
                "target": target_language,
                "format": "text"
            });
            let response = this
                .client
                .post(&this.endpoint)
                .query(&[("key", this.key.as_str())])
                .json(&body)
                .send()
                .await
                .with_context(|| "failed to reach translation API")?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!(
                    "Translation API error ({}): {}",
                    status,
                    extract_error_message(&text).unwrap_or(text)
                ));
            }
            extract_translation(&text)
        })
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(rename = "translatedText")]
    translated_text: String,
    #[serde(rename = "detectedSourceLanguage")]
    detected_source_language: Option<String>,
}

fn extract_translation(body: &str) -> anyhow::Result<String> {
    let payload: TranslateResponse = serde_json::from_str(body)
        .map_err(|err| anyhow!("failed to parse translation response JSON: {}", err))?;
    let translation = payload
        .data
        .translations
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no translation returned"))?;
    if let Some(source) = translation.detected_source_language.as_deref() {
        debug!("translation source detected as {}", source);
    }
    Ok(translation.translated_text)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
}
