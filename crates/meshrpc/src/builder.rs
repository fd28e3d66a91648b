//! # Dispatcher Builder
//!
//! Provides a fluent API for wiring a dispatcher to its collaborators.
//!
//! `build` never fails. A dispatcher missing its identity, transport or discovery is
//! still returned, in the uninitialized state, and every call through it fails with
//! [`Error::NotInitialized`](crate::Error::NotInitialized). This lets the process hand
//! out the dispatcher before bootstrap has finished.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::discovery::ServiceDiscovery;
use crate::dispatcher::Dispatcher;
use crate::dispatcher::Inner;
use crate::dispatcher::Wiring;
use crate::handler::LocalHandler;
use crate::message::RpcKind;
use crate::route::Route;
use crate::router::Router;
use crate::router::RoutingError;
use crate::serialize::Codec;
use crate::serialize::Serializer;
use crate::server::Server;
use crate::transport::Transport;

/// Fluent builder for creating dispatchers.
pub struct DispatcherBuilder<S = Codec> {
    server: Option<Server>,
    transport: Option<Arc<dyn Transport>>,
    discovery: Option<Arc<dyn ServiceDiscovery>>,
    serializer: S,
    router: Router,
    local: Option<Arc<dyn LocalHandler>>,
    default_timeout: Option<Duration>,
}

impl DispatcherBuilder<Codec> {
    pub fn new() -> Self {
        Self {
            server: None,
            transport: None,
            discovery: None,
            serializer: Codec::default(),
            router: Router::new(),
            local: None,
            default_timeout: None,
        }
    }

    /// Seeds identity, serializer and default deadline from a loaded config.
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .server(config.server.clone())
            .serializer(Codec::from_kind(config.rpc.serializer))
            .default_timeout(config.rpc.timeout())
    }
}

impl Default for DispatcherBuilder<Codec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> DispatcherBuilder<S> {
    /// This node's identity.
    pub fn server(mut self, server: Server) -> Self {
        self.server = Some(server);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn discovery(mut self, discovery: Arc<dyn ServiceDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Swaps the payload codec. Every node of a cluster must use the same one.
    pub fn serializer<T: Serializer>(self, serializer: T) -> DispatcherBuilder<T> {
        DispatcherBuilder {
            server: self.server,
            transport: self.transport,
            discovery: self.discovery,
            serializer,
            router: self.router,
            local: self.local,
            default_timeout: self.default_timeout,
        }
    }

    /// The bridge used for self-targeted calls and inbound envelopes.
    pub fn local_handler(mut self, local: Arc<dyn LocalHandler>) -> Self {
        self.local = Some(local);
        self
    }

    /// Deadline applied to calls whose context carries none.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Installs a routing function for `invoke_any` calls to `server_type`.
    pub fn route<F>(mut self, server_type: impl Into<String>, f: F) -> Self
    where
        F: Fn(RpcKind, &Route, &[Server]) -> Result<Server, RoutingError> + Send + Sync + 'static,
    {
        self.router.add_route(server_type, f);
        self
    }

    pub fn build(self) -> Dispatcher<S> {
        let wiring = match (self.server, self.transport, self.discovery) {
            (Some(server), Some(transport), Some(discovery)) => Some(Wiring {
                server,
                transport,
                discovery,
            }),
            (server, transport, discovery) => {
                tracing::warn!(
                    server = server.is_some(),
                    transport = transport.is_some(),
                    discovery = discovery.is_some(),
                    "dispatcher built without full wiring, calls will fail until rebuilt"
                );
                None
            }
        };

        Dispatcher::from_inner(Inner {
            wiring,
            serializer: self.serializer,
            router: self.router,
            local: self.local,
            default_timeout: self.default_timeout,
        })
    }
}
