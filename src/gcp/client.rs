//! GCP Client
//!
//! Main client for the Compute Engine API, combining authentication
//! and HTTP functionality.

use super::auth::{validate_project_id, GcpCredentials};
use super::http::{ApiError, GcpHttpClient};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

/// Public Compute Engine v1 endpoint
pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    endpoint: String,
}

impl GcpClient {
    pub fn new(credentials: GcpCredentials, project_id: &str, endpoint: &str) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Make a GET request to a GCP API.
    ///
    /// A rejected token is refreshed and the call retried once.
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self
            .credentials
            .get_token()
            .await
            .context("Failed to obtain GCP access token")?;

        match self.http.get(url, &token).await {
            Err(e) if is_unauthorized(&e) => {
                tracing::debug!("Access token rejected, refreshing");
                let token = self
                    .credentials
                    .refresh_token()
                    .await
                    .context("Failed to refresh GCP access token")?;
                self.http.get(url, &token).await
            },
            result => result,
        }
    }

    /// Pick the project for a call: an explicit override or the configured default
    pub fn project<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
        match requested {
            None => Ok(&self.project_id),
            Some(project) if validate_project_id(project) => Ok(project),
            Some(project) => Err(anyhow::anyhow!("Invalid project ID: {}", project)),
        }
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.endpoint,
            urlencoding::encode(project),
            path
        )
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, project: &str, zone: &str, resource: &str) -> Result<String> {
        if !is_location_name(zone) {
            anyhow::bail!("Invalid zone: {}", zone);
        }
        Ok(self.compute_url(project, &format!("zones/{}/{}", zone, resource)))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, project: &str, region: &str, resource: &str) -> Result<String> {
        if !is_location_name(region) {
            anyhow::bail!("Invalid region: {}", region);
        }
        Ok(self.compute_url(project, &format!("regions/{}/{}", region, resource)))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, project: &str, resource: &str) -> String {
        self.compute_url(project, &format!("global/{}", resource))
    }
}

fn is_unauthorized(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ApiError>()
        .is_some_and(|e| e.status == StatusCode::UNAUTHORIZED)
}

/// Zone and region names: lowercase letters, digits and hyphens, starting with a letter
fn is_location_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
