//! Configuration Management
//!
//! Loads the service configuration from a YAML file.

use crate::dispatch::{DEFAULT_LOOKUP_TIMEOUT, DEFAULT_MAX_CONCURRENT_LOOKUPS};
use crate::gcp::auth::validate_project_id;
use crate::gcp::client::DEFAULT_COMPUTE_ENDPOINT;
use crate::image::{self, ImageDescriptor};
use crate::resource::AgentPool;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8111";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Project used when a request does not name one
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub listen_addr: Option<String>,
    /// Compute Engine API base URL
    #[serde(default)]
    pub compute_endpoint: Option<String>,
    /// Service account JSON key; Application Default Credentials otherwise
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    #[serde(default)]
    pub lookup_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_concurrent_lookups: Option<usize>,
    #[serde(default)]
    pub agent_pools: Vec<AgentPool>,
    #[serde(default)]
    pub images: Vec<ImageDescriptor>,
}

impl Config {
    /// Default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gce-agents").join("config.yaml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        image::validate_all(&self.images)?;

        if let Some(project) = &self.project_id {
            if !validate_project_id(project) {
                anyhow::bail!("Invalid project_id: {}", project);
            }
        }

        if let Some(endpoint) = &self.compute_endpoint {
            let url = url::Url::parse(endpoint)
                .with_context(|| format!("Invalid compute_endpoint: {}", endpoint))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("compute_endpoint must be an http(s) URL: {}", endpoint);
            }
        }

        if let Some(addr) = &self.listen_addr {
            addr.parse::<SocketAddr>()
                .with_context(|| format!("Invalid listen_addr: {}", addr))?;
        }

        Ok(())
    }

    /// Get effective project (CLI > config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(crate::gcp::auth::get_default_project)
    }

    pub fn effective_listen_addr(&self) -> Result<SocketAddr> {
        let addr = self.listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR);
        addr.parse()
            .with_context(|| format!("Invalid listen address: {}", addr))
    }

    pub fn effective_endpoint(&self) -> &str {
        self.compute_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_COMPUTE_ENDPOINT)
    }

    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LOOKUP_TIMEOUT)
    }

    pub fn max_concurrent_lookups(&self) -> usize {
        self.max_concurrent_lookups
            .unwrap_or(DEFAULT_MAX_CONCURRENT_LOOKUPS)
    }
}
