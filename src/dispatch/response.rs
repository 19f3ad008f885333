//! Aggregated response
//!
//! Per-resource outcomes merged into the single document returned to the
//! settings page.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Outcome of one lookup
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceResult {
    Success(Value),
    Failure(String),
}

/// Successful lookup payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEntry {
    pub resource: String,
    pub items: Value,
}

/// Failed lookup, attributed to the first resource that reported the message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub resource: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedResponse {
    pub resources: Vec<ResourceEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorEntry>,
}

impl AggregatedResponse {
    /// Payload for `resource`, if it succeeded
    pub fn items(&self, resource: &str) -> Option<&Value> {
        self.resources
            .iter()
            .find(|e| e.resource == resource)
            .map(|e| &e.items)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize aggregated response")
    }
}

/// Accumulates outcomes in the order they are recorded.
///
/// Owned by the coordinating task only; handlers never see it.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    response: AggregatedResponse,
    seen_messages: HashSet<String>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome. Returns false when a failure was suppressed
    /// because the same message was already reported.
    pub fn record(&mut self, resource: &str, result: ResourceResult) -> bool {
        match result {
            ResourceResult::Success(items) => {
                self.response.resources.push(ResourceEntry {
                    resource: resource.to_string(),
                    items,
                });
                true
            },
            ResourceResult::Failure(message) => {
                if !self.seen_messages.insert(message.clone()) {
                    return false;
                }
                self.response.errors.push(ErrorEntry {
                    resource: resource.to_string(),
                    message,
                });
                true
            },
        }
    }

    pub fn finish(self) -> AggregatedResponse {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_messages_are_recorded_once() {
        let mut builder = ResponseBuilder::new();
        assert!(builder.record("zones", ResourceResult::Failure("auth denied".to_string())));
        assert!(!builder.record("images", ResourceResult::Failure("auth denied".to_string())));
        assert!(builder.record("networks", ResourceResult::Failure("quota exceeded".to_string())));

        let response = builder.finish();
        assert_eq!(
            response.errors,
            vec![
                ErrorEntry {
                    resource: "zones".to_string(),
                    message: "auth denied".to_string()
                },
                ErrorEntry {
                    resource: "networks".to_string(),
                    message: "quota exceeded".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_errors_omitted_when_empty() {
        let mut builder = ResponseBuilder::new();
        builder.record("zones", ResourceResult::Success(json!([{"id": "us-east1-b"}])));

        let body: Value = serde_json::from_slice(&builder.finish().to_json().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"resources": [{"resource": "zones", "items": [{"id": "us-east1-b"}]}]})
        );
    }

    #[test]
    fn test_error_section_serialized() {
        let mut builder = ResponseBuilder::new();
        builder.record("networks", ResourceResult::Failure("quota exceeded".to_string()));
        let response = builder.finish();

        assert_eq!(response.errors.len(), 1);
        assert!(response.items("networks").is_none());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "resources": [],
                "errors": [{"resource": "networks", "message": "quota exceeded"}]
            })
        );
    }
}
