use std::time::Duration;

use async_trait::async_trait;
use digest_domain::SummaryModel;
use digest_error::DigestError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MODEL: &str = "google/flan-t5-base";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HfConfig {
    pub base: String,
    pub model: String,
    pub token: Option<String>,
}

impl Default for HfConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            token: None,
        }
    }
}

impl HfConfig {
    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            self.model.trim_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Parameters {
    max_length: usize,
    min_length: usize,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct Generated {
    #[serde(alias = "generated_text")]
    summary_text: String,
}

/// Summarization over the Hugging Face hosted inference API.
pub struct HfSummaryModel {
    config: HfConfig,
    client: Client,
}

impl HfSummaryModel {
    pub fn new(config: HfConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, client }
    }
}

fn request_body(text: &str, max_len: usize, min_len: usize) -> SummarizeRequest<'_> {
    SummarizeRequest {
        inputs: text,
        parameters: Parameters {
            max_length: max_len,
            min_length: min_len.min(max_len),
            do_sample: false,
        },
    }
}

fn parse_summary(body: Value) -> Result<String, DigestError> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(DigestError::summarization(format!("model error: {error}")));
    }
    let first = match body {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => {
            return Err(DigestError::summarization(format!(
                "unexpected response shape: {other}"
            )))
        }
    };
    let generated: Generated = serde_json::from_value(first)
        .map_err(|e| DigestError::summarization(format!("response parse failed: {e}")))?;
    Ok(generated.summary_text.trim().to_string())
}

#[async_trait]
impl SummaryModel for HfSummaryModel {
    async fn summarize(
        &self,
        text: &str,
        max_len: usize,
        min_len: usize,
    ) -> Result<String, DigestError> {
        let url = self.config.endpoint();
        debug!(url, max_len, min_len, "summarization POST");

        let mut req = self
            .client
            .post(&url)
            .json(&request_body(text, max_len, min_len));
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DigestError::summarization(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DigestError::summarization(format!(
                "http error ({status}): {body}"
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| DigestError::summarization(format!("response parse failed: {e}")))?;
        parse_summary(body)
    }
}
