//! # Service Discovery
//!
//! Resolves server IDs and server types to node records.
//!
//! The dispatcher reads one snapshot per call and caches nothing, so a backend may
//! update its topology at any time. Lookups must be safe under concurrent reads.

use dashmap::DashMap;

use crate::server::Server;

/// Discovery failures.
///
/// A missing node is reported here and never as a transport error: "unknown" and
/// "unreachable" are different conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// No record exists for the requested server ID.
    #[error("server not found: {0}")]
    ServerNotFound(String),
    /// No node of the requested type is currently registered.
    #[error("no servers available of type: {0}")]
    NoServersAvailable(String),
    /// The backing registry could not be queried.
    #[error("discovery backend unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Read side of the cluster topology.
///
/// This trait is designed to be object-safe (`Arc<dyn ServiceDiscovery>`).
#[async_trait::async_trait]
pub trait ServiceDiscovery: Send + Sync + 'static {
    /// Returns the node registered under `id`.
    async fn get_server(&self, id: &str) -> Result<Server>;

    /// Returns every node currently registered with the given type.
    ///
    /// An empty list is a valid answer; the caller decides whether that is an error.
    async fn get_servers_by_type(&self, server_type: &str) -> Result<Vec<Server>>;
}

/// An in-process topology table.
///
/// Backed by a `DashMap` so lookups from many concurrent calls never contend on a
/// global lock while a background task adds or removes nodes.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    servers: DashMap<String, Server>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table pre-populated with `servers`.
    pub fn with_servers(servers: impl IntoIterator<Item = Server>) -> Self {
        let discovery = Self::new();
        for server in servers {
            discovery.add_server(server);
        }
        discovery
    }

    /// Registers or replaces a node.
    pub fn add_server(&self, server: Server) {
        tracing::debug!(server = %server, "discovery: server added");
        self.servers.insert(server.id.clone(), server);
    }

    /// Removes a node, returning its last record.
    pub fn remove_server(&self, id: &str) -> Option<Server> {
        let removed = self.servers.remove(id).map(|(_, server)| server);
        if let Some(server) = &removed {
            tracing::debug!(server = %server, "discovery: server removed");
        }
        removed
    }

    /// A snapshot of every registered node.
    pub fn servers(&self) -> Vec<Server> {
        self.servers.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[async_trait::async_trait]
impl ServiceDiscovery for StaticDiscovery {
    async fn get_server(&self, id: &str) -> Result<Server> {
        self.servers
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DiscoveryError::ServerNotFound(id.to_string()))
    }

    async fn get_servers_by_type(&self, server_type: &str) -> Result<Vec<Server>> {
        Ok(self
            .servers
            .iter()
            .filter(|entry| entry.value().kind == server_type)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
