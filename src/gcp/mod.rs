//! GCP API interaction module
//!
//! Authentication and the HTTP client used by the resource lookups.
//!
//! - [`auth`] - Application Default Credentials, service account keys, static tokens
//! - [`client`] - Compute Engine client and URL builders
//! - [`http`] - HTTP utilities and API error mapping
//!
//! # Example
//!
//! ```ignore
//! use gce_agents::gcp::{auth::GcpCredentials, client::{GcpClient, DEFAULT_COMPUTE_ENDPOINT}};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = GcpCredentials::application_default().await?;
//!     let client = GcpClient::new(credentials, "my-project", DEFAULT_COMPUTE_ENDPOINT)?;
//!     let zones = client.get(&client.compute_url("my-project", "zones")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
