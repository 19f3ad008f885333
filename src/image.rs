//! Cloud image settings
//!
//! Provisioning parameters for one agent image, as persisted by the CI server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Provisioning parameters for one cloud image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    /// Identifier of this image configuration, used as the agent name prefix
    pub source_id: String,
    pub source_image: String,
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    pub machine_type: String,
    pub max_instances: u32,
    #[serde(default, rename = "agent_pool_id", alias = "agentPoolId")]
    pub agent_pool_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub preemptible: bool,
}

impl ImageDescriptor {
    pub fn validate(&self) -> Result<()> {
        if self.source_id.trim().is_empty() {
            anyhow::bail!("Image sourceId must not be empty");
        }
        if self.source_image.trim().is_empty() {
            anyhow::bail!("Image {} has an empty sourceImage", self.source_id);
        }
        Ok(())
    }

    /// Parse and validate an `images_data` JSON array
    pub fn parse_list(json: &str) -> Result<Vec<Self>> {
        let images: Vec<Self> =
            serde_json::from_str(json).context("Failed to parse image settings")?;
        validate_all(&images)?;
        Ok(images)
    }
}

/// Validate every descriptor and reject repeated `sourceId`s
pub fn validate_all(images: &[ImageDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();
    for image in images {
        image.validate()?;
        if !seen.insert(image.source_id.as_str()) {
            anyhow::bail!("Duplicate image sourceId: {}", image.source_id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_applies_defaults() {
        let images = ImageDescriptor::parse_list(
            r#"[{
                "sourceId": "linux-agent",
                "sourceImage": "teamcity-agent-2024",
                "zone": "us-central1-a",
                "machineType": "n1-standard-2",
                "maxInstances": 4
            }]"#,
        )
        .unwrap();

        assert_eq!(images.len(), 1);
        let image = &images[0];
        assert!(!image.preemptible);
        assert_eq!(image.network, None);
        assert_eq!(image.agent_pool_id, None);
        assert_eq!(image.max_instances, 4);
    }

    #[test]
    fn test_parse_reads_optional_fields() {
        let images = ImageDescriptor::parse_list(
            r#"[{
                "sourceId": "win",
                "sourceImage": "windows-agent",
                "zone": "europe-west1-b",
                "network": "ci",
                "machineType": "n2-standard-4",
                "maxInstances": 0,
                "agent_pool_id": 7,
                "profileId": "gce-1",
                "preemptible": true
            }]"#,
        )
        .unwrap();

        let image = &images[0];
        assert_eq!(image.network.as_deref(), Some("ci"));
        assert_eq!(image.agent_pool_id, Some(7));
        assert_eq!(image.profile_id.as_deref(), Some("gce-1"));
        assert!(image.preemptible);
    }

    #[test]
    fn test_negative_max_instances_rejected() {
        let result = ImageDescriptor::parse_list(
            r#"[{"sourceId":"a","sourceImage":"b","zone":"z","machineType":"m","maxInstances":-1}]"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_source_id_rejected() {
        let err = ImageDescriptor::parse_list(
            r#"[{"sourceId":" ","sourceImage":"b","zone":"z","machineType":"m","maxInstances":1}]"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Image sourceId must not be empty");
    }

    #[test]
    fn test_duplicate_source_id_rejected() {
        let err = ImageDescriptor::parse_list(
            r#"[
                {"sourceId":"a","sourceImage":"b","zone":"z","machineType":"m","maxInstances":1},
                {"sourceId":"a","sourceImage":"c","zone":"z","machineType":"m","maxInstances":1}
            ]"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate image sourceId: a");
    }
}
