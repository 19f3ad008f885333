//! Lookup parameters
//!
//! The flat string map submitted with a settings request. One instance is
//! shared read-only by every handler of a dispatch.

use anyhow::Result;
use std::collections::HashMap;

/// Prefix the CI server puts on form property names
const PROPERTY_PREFIX: &str = "prop:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRequest {
    params: HashMap<String, String>,
}

impl ResourceRequest {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Build from submitted form pairs, dropping the `prop:` prefix from keys.
    /// Later pairs win over earlier ones with the same key.
    pub fn from_form_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let params = pairs
            .into_iter()
            .map(|(key, value)| {
                let key = key
                    .strip_prefix(PROPERTY_PREFIX)
                    .map(str::to_string)
                    .unwrap_or(key);
                (key, value)
            })
            .collect();

        Self { params }
    }

    /// Value for `key`, treating blank values as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {}", key))
    }
}

impl FromIterator<(String, String)> for ResourceRequest {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_missing() {
        let request: ResourceRequest = [
            ("zone".to_string(), "  ".to_string()),
            ("region".to_string(), " us-east1 ".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(request.get("zone"), None);
        assert_eq!(request.get("region"), Some("us-east1"));
        assert!(request.get("project").is_none());
    }

    #[test]
    fn test_require_reports_key() {
        let request = ResourceRequest::default();
        let err = request.require("zone").unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: zone");
    }

    #[test]
    fn test_form_pairs_strip_property_prefix() {
        let request = ResourceRequest::from_form_pairs(vec![
            ("prop:zone".to_string(), "us-central1-b".to_string()),
            ("project".to_string(), "ci-agents-01".to_string()),
        ]);

        assert_eq!(request.get("zone"), Some("us-central1-b"));
        assert_eq!(request.get("project"), Some("ci-agents-01"));
        assert_eq!(request.get("prop:zone"), None);
    }
}
