//! Model caller: the single request/response boundary to a remote
//! text-generation service.
//!
//! Callers never see a Rust error from this layer: every transport,
//! authentication, timeout or payload problem comes back as a tagged
//! [`ModelReply::Fault`], and the caller decides what to do with it.

pub mod chat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use chat::ChatCompletionsCaller;

/// One generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// System-level instructions describing the role.
    pub role_instructions: String,
    /// User-level prompt for this turn.
    pub prompt: String,
    /// Remote model identifier.
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Category of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Connection could not be established or was dropped.
    Network,
    /// The per-call deadline elapsed.
    Timeout,
    /// Credential rejected (401/403).
    Auth,
    /// Service asked us to slow down (429).
    RateLimited,
    /// Any other non-success HTTP status.
    Status,
    /// Body could not be parsed or had no generated text.
    MalformedResponse,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Auth => write!(f, "auth"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Status => write!(f, "status"),
            Self::MalformedResponse => write!(f, "malformed_response"),
        }
    }
}

/// A failed model call. Displays as `Error: <kind>: <detail>`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Error: {kind}: {detail}")]
pub struct TransportFault {
    pub kind: FaultKind,
    pub detail: String,
}

impl TransportFault {
    pub fn new(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Outcome of a model call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Generated text.
    Text(String),
    /// The call did not produce text.
    Fault(TransportFault),
}

impl ModelReply {
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    /// Generated text, or the fault rendered with the error marker.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Fault(fault) => fault.to_string(),
        }
    }
}

/// Remote text generation. One attempt per call, no retries.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn call(&self, request: &ModelRequest) -> ModelReply;
}
