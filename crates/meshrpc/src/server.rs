//! Cluster node descriptors.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// A node of the cluster as seen by service discovery.
///
/// Discovery owns these records. Callers receive snapshots and never mutate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Unique within the cluster.
    pub id: String,
    /// The role this node plays (e.g. `connector`, `room`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form attributes; transports keep their addressing data here.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub hostname: String,
    /// Whether the node accepts client connections.
    #[serde(default)]
    pub frontend: bool,
}

impl Server {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            metadata: HashMap::new(),
            hostname: String::new(),
            frontend: false,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_frontend(mut self, frontend: bool) -> Self {
        self.frontend = frontend;
        self
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let server = Server::new("conn-1", "connector")
            .with_hostname("edge-a")
            .with_frontend(true)
            .with_metadata("region", "eu");

        assert_eq!(server.hostname, "edge-a");
        assert!(server.frontend);
        assert_eq!(server.metadata.get("region").map(String::as_str), Some("eu"));
        assert_eq!(server.to_string(), "connector/conn-1");
    }

    #[test]
    fn test_reads_type_field() {
        let server: Server = serde_json::from_str(r#"{"id": "room-1", "type": "room"}"#).unwrap();
        assert_eq!(server, Server::new("room-1", "room"));
    }
}
