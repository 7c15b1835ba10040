//! Remote document-understanding adapter over the Anthropic messages API.
//!
//! One rendered page image per call; responses follow a line-oriented
//! `Field: value` layout that `parse_response` tolerantly picks apart. API
//! failures retry with an exponential policy independent of the document-level
//! retry loop.

use super::{Extractor, RawExtraction};
use crate::config::Api;
use crate::render::PageImage;
use crate::retry::{Attempted, RetryPolicy};
use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const PROMPT: &str = "Please analyze this financial document and extract the following information:\n\
\n\
1. Document type (e.g., W-2, 1099-INT, 1099-R, Investment Statement, Account Summary, etc.)\n\
2. Account holder/Client name\n\
3. Statement period or tax year\n\
4. Financial institution name\n\
5. Account number (last 4 digits or masked)\n\
6. Total account value/balance (if applicable)\n\
\n\
Format your response exactly as follows, with each item on a new line:\n\
Document type: [type]\n\
Client name: [name]\n\
Period/Year: [period]\n\
Institution: [name]\n\
Account number: [number]\n\
Total value: [amount]";

pub struct AnthropicExtractor {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: String,
    policy: RetryPolicy,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicExtractor {
    pub fn new(cfg: &Api) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .with_context(|| format!("{} is not set", cfg.api_key_env))?;
        if api_key.trim().is_empty() {
            bail!("{} is empty", cfg.api_key_env);
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            api_key,
            policy: RetryPolicy::exponential(cfg.max_attempts, cfg.backoff_base_seconds),
        })
    }

    fn call_once(&self, image_b64: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": PROMPT },
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": "image/png",
                            "data": image_b64,
                        }
                    }
                ]
            }]
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .with_context(|| "sending extraction request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("extraction API returned {status}: {body}");
        }

        let parsed: MessagesResponse = resp
            .json()
            .with_context(|| "parsing extraction response")?;
        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();
        if text.trim().is_empty() {
            bail!("extraction response had no text content");
        }
        debug!("extraction response: {} chars", text.len());
        Ok(text)
    }
}

impl Extractor for AnthropicExtractor {
    fn extract(&self, image: &PageImage) -> Result<RawExtraction> {
        let image_b64 = BASE64.encode(&image.png);
        match self.policy.run("extraction call", |_| self.call_once(&image_b64)) {
            Attempted::Succeeded { value, .. } => Ok(parse_response(&value)),
            Attempted::Failed { attempts, error } => {
                Err(error.context(format!("extraction failed after {attempts} attempts")))
            }
        }
    }
}

/// Parse the line-oriented `Field: value` response. Unrecognized lines are
/// ignored; missing fields stay empty. The verbatim response is retained.
pub fn parse_response(text: &str) -> RawExtraction {
    let mut out = RawExtraction {
        raw_response: text.to_string(),
        ..Default::default()
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        let value = match line.split_once(':') {
            Some((_, v)) => v.trim().to_string(),
            None => continue,
        };

        if lower.contains("document type") {
            out.document_type = value;
        } else if lower.contains("client name") || lower.contains("recipient") {
            out.client_name = value;
        } else if lower.contains("account number") {
            out.account_number = value;
        } else if lower.contains("period") || lower.contains("year") {
            out.period_year = value;
        } else if lower.contains("institution") || lower.contains("payer") {
            out.institution = value;
        } else if lower.contains("total value") || lower.contains("balance") {
            out.total_value = value;
        }
    }

    out
}
