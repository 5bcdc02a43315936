//! LLM error types

use thiserror::Error;

/// LLM error with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Connection, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Decode, message)
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Service, message)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::MalformedResponse, message)
    }
}

/// Error classification, shown to the operator with the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Could not reach the service, or the request timed out
    Connection,
    /// Response body was not JSON
    Decode,
    /// The service answered with an `error` field or a failure status
    Service,
    /// JSON without a usable `response` string
    MalformedResponse,
}

impl LlmErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connection => "connection error",
            Self::Decode => "decode error",
            Self::Service => "service error",
            Self::MalformedResponse => "malformed response",
        }
    }
}
