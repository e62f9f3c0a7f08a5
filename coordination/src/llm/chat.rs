//! OpenAI-compatible chat-completions caller.
//!
//! Serves both the OpenAI endpoint used by the debate roles and the Hugging
//! Face router used by the single small-model solver; both speak the same
//! `POST /v1/chat/completions` dialect.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{FaultKind, ModelCaller, ModelReply, ModelRequest, TransportFault};

/// Longest slice of an error body kept in a fault detail.
const MAX_ERROR_BODY: usize = 300;

/// Chat-completions client bound to one endpoint and credential.
#[derive(Debug, Clone)]
pub struct ChatCompletionsCaller {
    client: reqwest::Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl ChatCompletionsCaller {
    /// Caller with its own HTTP client.
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, url, api_key, timeout))
    }

    /// Caller sharing an existing connection pool.
    pub fn with_client(client: reqwest::Client, url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, request: &ModelRequest) -> Result<String, TransportFault> {
        let body = serde_json::json!({
            "model": request.model_id,
            "messages": [
                {"role": "system", "content": request.role_instructions},
                {"role": "user", "content": request.prompt}
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_fault(status, &text));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TransportFault::new(FaultKind::Timeout, e.to_string())
            } else {
                TransportFault::new(FaultKind::MalformedResponse, e.to_string())
            }
        })?;

        parse_content(&json)
    }
}

#[async_trait]
impl ModelCaller for ChatCompletionsCaller {
    async fn call(&self, request: &ModelRequest) -> ModelReply {
        let start = Instant::now();
        match self.send(request).await {
            Ok(text) => {
                debug!(
                    model = %request.model_id,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    chars = text.len(),
                    "model call succeeded"
                );
                ModelReply::Text(text)
            }
            Err(fault) => {
                warn!(
                    model = %request.model_id,
                    kind = %fault.kind,
                    detail = %fault.detail,
                    "model call failed"
                );
                ModelReply::Fault(fault)
            }
        }
    }
}

fn classify_send_error(e: reqwest::Error) -> TransportFault {
    let kind = if e.is_timeout() {
        FaultKind::Timeout
    } else {
        FaultKind::Network
    };
    TransportFault::new(kind, e.to_string())
}

/// Map a non-success status to a fault kind.
pub fn status_fault(status: StatusCode, body: &str) -> TransportFault {
    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FaultKind::Auth,
        StatusCode::TOO_MANY_REQUESTS => FaultKind::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => FaultKind::Timeout,
        _ => FaultKind::Status,
    };
    let body: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
    TransportFault::new(kind, format!("{} - {}", status.as_u16(), body))
}

/// Pull `choices[0].message.content` out of a chat-completions body.
pub fn parse_content(json: &serde_json::Value) -> Result<String, TransportFault> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            let snippet: String = json.to_string().chars().take(MAX_ERROR_BODY).collect();
            TransportFault::new(
                FaultKind::MalformedResponse,
                format!("Unexpected response format: {}", snippet),
            )
        })
}
