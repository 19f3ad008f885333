//! Resource Registry
//!
//! The closed set of lookups the settings page can ask for, and the table
//! mapping each of them to the handler that serves it.

use super::request::ResourceRequest;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kinds of lookups offered by the settings page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    AgentPools,
    Zones,
    Networks,
    Subnets,
    MachineTypes,
    Images,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::AgentPools,
        ResourceKind::Zones,
        ResourceKind::Networks,
        ResourceKind::Subnets,
        ResourceKind::MachineTypes,
        ResourceKind::Images,
    ];

    /// Wire name used in requests and responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentPools => "agentPools",
            Self::Zones => "zones",
            Self::Networks => "networks",
            Self::Subnets => "subnets",
            Self::MachineTypes => "machineTypes",
            Self::Images => "images",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lookup against an external provider.
///
/// Expected provider failures are returned as `Err`; the message ends up in
/// the response's error section.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn handle(&self, params: &ResourceRequest) -> Result<Value>;
}

/// Case-insensitive name to handler table, built once at startup
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, (String, Arc<dyn ResourceHandler>)>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`; replaces an earlier registration
    /// with the same name in any letter case.
    pub fn register(&mut self, name: &str, handler: Arc<dyn ResourceHandler>) -> &mut Self {
        self.handlers
            .insert(name.to_ascii_lowercase(), (name.to_string(), handler));
        self
    }

    pub fn register_kind(&mut self, kind: ResourceKind, handler: Arc<dyn ResourceHandler>) -> &mut Self {
        self.register(kind.as_str(), handler)
    }

    /// Resolve a requested name to its canonical name and handler
    pub fn resolve(&self, name: &str) -> Option<(&str, Arc<dyn ResourceHandler>)> {
        self.handlers
            .get(&name.trim().to_ascii_lowercase())
            .map(|(canonical, handler)| (canonical.as_str(), Arc::clone(handler)))
    }

    /// Canonical names of every registered handler, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(Value);

    #[async_trait]
    impl ResourceHandler for Fixed {
        async fn handle(&self, _params: &ResourceRequest) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_kinds_resolve_in_any_case() {
        let mut registry = HandlerRegistry::new();
        for kind in ResourceKind::ALL {
            registry.register_kind(kind, Arc::new(Fixed(json!(kind.as_str()))));
        }

        assert_eq!(registry.resolve("machinetypes").map(|(n, _)| n), Some("machineTypes"));
        assert_eq!(registry.resolve("AGENTPOOLS").map(|(n, _)| n), Some("agentPools"));
        assert_eq!(registry.resolve(" zones ").map(|(n, _)| n), Some("zones"));
        assert!(registry.resolve("bogus").is_none());
    }

    #[tokio::test]
    async fn test_resolve_returns_canonical_name() {
        let mut registry = HandlerRegistry::new();
        registry.register_kind(ResourceKind::Zones, Arc::new(Fixed(json!(["a"]))));

        let (name, handler) = registry.resolve("ZONES").expect("zones should resolve");
        assert_eq!(name, "zones");
        assert_eq!(
            handler.handle(&ResourceRequest::default()).await.unwrap(),
            json!(["a"])
        );
        assert!(registry.resolve("networks").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = HandlerRegistry::new();
        registry
            .register("images", Arc::new(Fixed(json!(1))))
            .register("Images", Arc::new(Fixed(json!(2))));

        assert_eq!(registry.names(), vec!["Images"]);
    }
}
