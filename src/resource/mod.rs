//! Resource lookup layer
//!
//! Everything the settings page can ask the provider about.
//!
//! # Architecture
//!
//! - [`registry`] - The closed set of lookup kinds and the name → handler table
//! - [`request`] - Shared, read-only lookup parameters
//! - [`fetcher`] - Paginated Compute Engine list calls
//! - [`lookups`] - One handler per lookup kind
//!
//! # Example
//!
//! ```ignore
//! use gce_agents::resource::{gcp_registry, ResourceRequest};
//!
//! async fn zones(client: GcpClient) -> anyhow::Result<serde_json::Value> {
//!     let registry = gcp_registry(client, Vec::new());
//!     let (_, handler) = registry.resolve("zones").unwrap();
//!     handler.handle(&ResourceRequest::default()).await
//! }
//! ```

pub mod fetcher;
pub mod lookups;
mod registry;
mod request;

pub use lookups::{gcp_registry, AgentPool};
pub use registry::{HandlerRegistry, ResourceHandler, ResourceKind};
pub use request::ResourceRequest;
