//! Resource Lookups
//!
//! Concrete handlers behind each [`ResourceKind`]. Compute lookups list a
//! Compute Engine collection and render the fields the settings page needs.

use super::fetcher::{extract_short_name, fetch_all, optional_str, required_str};
use super::registry::{HandlerRegistry, ResourceHandler, ResourceKind};
use super::request::ResourceRequest;
use crate::gcp::client::GcpClient;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Parameter overriding the configured project for one request
pub const PROJECT_PARAM: &str = "project";
pub const ZONE_PARAM: &str = "zone";
pub const REGION_PARAM: &str = "region";

/// Agent pool known to the CI server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPool {
    pub id: i64,
    pub name: String,
}

/// Build the registry serving every [`ResourceKind`]
pub fn gcp_registry(client: GcpClient, agent_pools: Vec<AgentPool>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register_kind(ResourceKind::AgentPools, Arc::new(AgentPoolsHandler::new(agent_pools)))
        .register_kind(ResourceKind::Zones, Arc::new(ZonesHandler::new(client.clone())))
        .register_kind(ResourceKind::Networks, Arc::new(NetworksHandler::new(client.clone())))
        .register_kind(ResourceKind::Subnets, Arc::new(SubnetsHandler::new(client.clone())))
        .register_kind(
            ResourceKind::MachineTypes,
            Arc::new(MachineTypesHandler::new(client.clone())),
        )
        .register_kind(ResourceKind::Images, Arc::new(ImagesHandler::new(client)));
    registry
}

/// Items marked deprecated, obsolete or deleted are not offered for new agents
fn is_retired(item: &Value) -> bool {
    matches!(
        item.get("deprecated")
            .and_then(|d| d.get("state"))
            .and_then(|s| s.as_str()),
        Some("DEPRECATED") | Some("OBSOLETE") | Some("DELETED")
    )
}

fn sorted_by_id(mut items: Vec<Value>) -> Value {
    items.sort_by(|a, b| {
        let a = a.get("id").and_then(|v| v.as_str()).unwrap_or("");
        let b = b.get("id").and_then(|v| v.as_str()).unwrap_or("");
        a.cmp(b)
    });
    Value::Array(items)
}

// =============================================================================
// Agent pools
// =============================================================================

pub struct AgentPoolsHandler {
    pools: Vec<AgentPool>,
}

impl AgentPoolsHandler {
    pub fn new(mut pools: Vec<AgentPool>) -> Self {
        pools.sort_by_key(|p| p.id);
        Self { pools }
    }
}

#[async_trait]
impl ResourceHandler for AgentPoolsHandler {
    async fn handle(&self, _params: &ResourceRequest) -> Result<Value> {
        Ok(serde_json::to_value(&self.pools)?)
    }
}

// =============================================================================
// Compute Engine
// =============================================================================

pub struct ZonesHandler {
    client: GcpClient,
}

impl ZonesHandler {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for ZonesHandler {
    async fn handle(&self, params: &ResourceRequest) -> Result<Value> {
        let project = self.client.project(params.get(PROJECT_PARAM))?;
        let url = self.client.compute_url(project, "zones");

        let mut zones = Vec::new();
        for item in fetch_all(&self.client, &url).await? {
            if !matches!(item.get("status").and_then(|v| v.as_str()), None | Some("UP")) {
                continue;
            }
            let name = required_str(&item, "name")?;
            let description = match optional_str(&item, "description") {
                "" => name,
                d => d,
            };
            zones.push(json!({
                "id": name,
                "region": extract_short_name(optional_str(&item, "region")),
                "description": description,
            }));
        }

        Ok(sorted_by_id(zones))
    }
}

pub struct NetworksHandler {
    client: GcpClient,
}

impl NetworksHandler {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for NetworksHandler {
    async fn handle(&self, params: &ResourceRequest) -> Result<Value> {
        let project = self.client.project(params.get(PROJECT_PARAM))?;
        let url = self.client.compute_global_url(project, "networks");

        let networks = fetch_all(&self.client, &url)
            .await?
            .iter()
            .map(|item| -> Result<Value> {
                Ok(json!({
                    "id": required_str(item, "name")?,
                    "description": optional_str(item, "description"),
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(sorted_by_id(networks))
    }
}

pub struct SubnetsHandler {
    client: GcpClient,
}

impl SubnetsHandler {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for SubnetsHandler {
    async fn handle(&self, params: &ResourceRequest) -> Result<Value> {
        let region = params.require(REGION_PARAM)?;
        let project = self.client.project(params.get(PROJECT_PARAM))?;
        let url = self
            .client
            .compute_regional_url(project, region, "subnetworks")?;

        let subnets = fetch_all(&self.client, &url)
            .await?
            .iter()
            .map(|item| -> Result<Value> {
                Ok(json!({
                    "id": required_str(item, "name")?,
                    "network": extract_short_name(optional_str(item, "network")),
                    "ipCidrRange": optional_str(item, "ipCidrRange"),
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(sorted_by_id(subnets))
    }
}

pub struct MachineTypesHandler {
    client: GcpClient,
}

impl MachineTypesHandler {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for MachineTypesHandler {
    async fn handle(&self, params: &ResourceRequest) -> Result<Value> {
        let zone = params.require(ZONE_PARAM)?;
        let project = self.client.project(params.get(PROJECT_PARAM))?;
        let url = self.client.compute_zonal_url(project, zone, "machineTypes")?;

        let mut machine_types = Vec::new();
        for item in fetch_all(&self.client, &url).await? {
            if is_retired(&item) {
                continue;
            }
            let name = required_str(&item, "name")?;
            let cpus = item
                .get("guestCpus")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| anyhow::anyhow!("Malformed machine type {}: missing 'guestCpus'", name))?;
            let memory_mb = item
                .get("memoryMb")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| anyhow::anyhow!("Malformed machine type {}: missing 'memoryMb'", name))?;

            machine_types.push(json!({
                "id": name,
                "cpus": cpus,
                "memoryMb": memory_mb,
                "description": optional_str(&item, "description"),
            }));
        }

        Ok(sorted_by_id(machine_types))
    }
}

pub struct ImagesHandler {
    client: GcpClient,
}

impl ImagesHandler {
    pub fn new(client: GcpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for ImagesHandler {
    async fn handle(&self, params: &ResourceRequest) -> Result<Value> {
        let project = self.client.project(params.get(PROJECT_PARAM))?;
        let url = self.client.compute_global_url(project, "images");

        let mut images = Vec::new();
        for item in fetch_all(&self.client, &url).await? {
            if is_retired(&item) {
                continue;
            }
            images.push(json!({
                "id": required_str(&item, "name")?,
                "description": optional_str(&item, "description"),
                "selfLink": optional_str(&item, "selfLink"),
            }));
        }

        Ok(sorted_by_id(images))
    }
}
