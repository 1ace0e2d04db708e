use anyhow::{Context, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{AnnotateResponse, RecognizeFuture, Recognizer};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Clone)]
pub struct GoogleVision {
    key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleVision {
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

impl Recognizer for GoogleVision {
    fn annotate(&self, image: Vec<u8>) -> RecognizeFuture {
        let this = self.clone();
        Box::pin(async move {
            let body = json!({
                "requests": [
                    {
                        "features": [{"type": "TEXT_DETECTION"}],
                        "image": {"content": BASE64.encode(&image)}
                    }
                ]
            });
            debug!("sending {} bytes to text detection", image.len());
            let response = this
                .client
                .post(&this.endpoint)
                .query(&[("key", this.key.as_str())])
                .json(&body)
                .send()
                .await
                .with_context(|| "failed to reach text detection API")?;

            let status = response.status();
            let is_json = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_lowercase().starts_with("application/json"))
                .unwrap_or(false);
            let text = response.text().await.unwrap_or_default();
            if !status.is_success() {
                if !is_json {
                    return Err(anyhow!(
                        "Something really bad happened with underlying API[{}]: {}",
                        status.as_u16(),
                        plain_error_reason(&text)
                    ));
                }
                return Err(anyhow!(
                    "Error in underlying API[{}]: {}",
                    status.as_u16(),
                    extract_error_message(&text).unwrap_or_else(|| "unknown error".to_string())
                ));
            }

            serde_json::from_str::<AnnotateResponse>(&text)
                .map_err(|err| anyhow!("failed to parse text detection response JSON: {}", err))
        })
    }
}

/// HTML error pages are reduced to a generic reason.
fn plain_error_reason(body: &str) -> String {
    if body.matches('\n').count() > 1 {
        "unknown error".to_string()
    } else {
        body.trim().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn extract_error_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    envelope
        .message
        .or_else(|| envelope.error.and_then(|error| error.message))
}
