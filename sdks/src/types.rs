// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Types
//!
//! Wire types shared by every agent on the network, static or dynamic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::TemplateKind;

/// Body of `POST /process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub intent: String,
    pub concept: String,
    #[serde(default)]
    pub args: Value,
}

impl ProcessRequest {
    pub fn new(intent: impl Into<String>, concept: impl Into<String>, args: Value) -> Self {
        Self {
            intent: intent.into(),
            concept: concept.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Body returned by `POST /process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub confidence: f64,
}

impl ProcessResponse {
    pub fn success(data: Value, confidence: f64) -> Self {
        Self {
            status: ResponseStatus::Success,
            data,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            data: serde_json::json!({ "error": message.into() }),
            confidence: 0.0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Error message carried by an error response, if any.
    pub fn error_message(&self) -> Option<&str> {
        if self.is_success() {
            return None;
        }
        self.data.get("error").and_then(Value::as_str)
    }
}

/// Body returned by `GET /health`.
///
/// Static agents are not necessarily built on this SDK, so `status` is kept as a
/// free-form string and interpreted leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            agent_id: None,
            template: None,
            concept: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "healthy" | "ok" | "up"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_request_defaults_args() {
        let req: ProcessRequest =
            serde_json::from_str(r#"{"intent":"define","concept":"entropy"}"#).unwrap();
        assert_eq!(req.intent, "define");
        assert!(req.args.is_null());
    }

    #[test]
    fn test_error_response_carries_message() {
        let resp = ProcessResponse::error("unsupported intent");
        assert!(!resp.is_success());
        assert_eq!(resp.error_message(), Some("unsupported intent"));
        assert_eq!(resp.confidence, 0.0);
    }

    #[test]
    fn test_health_status_is_lenient() {
        let ok: HealthResponse = serde_json::from_str(r#"{"status":"OK"}"#).unwrap();
        assert!(ok.is_healthy());

        let down: HealthResponse = serde_json::from_str(r#"{"status":"starting"}"#).unwrap();
        assert!(!down.is_healthy());
    }

    #[test]
    fn test_success_confidence_is_clamped() {
        let resp = ProcessResponse::success(serde_json::json!({}), 1.7);
        assert_eq!(resp.confidence, 1.0);
    }
}
