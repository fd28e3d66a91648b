//! # Router
//!
//! Picks one node out of the candidates discovery returned for a server type.
//!
//! Each server type may carry its own routing function (sticky rooms, sharding by
//! key, ...). Types without one fall back to a uniformly random pick.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::message::RpcKind;
use crate::route::Route;
use crate::server::Server;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// The candidate list was empty.
    #[error("no candidates of type '{0}'")]
    NoCandidates(String),
    /// A custom routing function refused to pick a node.
    #[error("routing rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, RoutingError>;

/// A custom routing function: `(kind, route, candidates) -> chosen node`.
pub type RoutingFn = Arc<dyn Fn(RpcKind, &Route, &[Server]) -> Result<Server> + Send + Sync>;

/// Per-server-type routing table.
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<String, RoutingFn>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a routing function for `server_type`, replacing any previous one.
    pub fn add_route<F>(&mut self, server_type: impl Into<String>, f: F)
    where
        F: Fn(RpcKind, &Route, &[Server]) -> Result<Server> + Send + Sync + 'static,
    {
        self.routes.insert(server_type.into(), Arc::new(f));
    }

    /// Chooses the node that serves `route`.
    ///
    /// A custom routing function must return one of `candidates`.
    pub fn route(&self, kind: RpcKind, route: &Route, candidates: &[Server]) -> Result<Server> {
        if candidates.is_empty() {
            return Err(RoutingError::NoCandidates(route.server_type().to_string()));
        }

        match self.routes.get(route.server_type()) {
            Some(f) => {
                let chosen = f(kind, route, candidates)?;
                if !candidates.contains(&chosen) {
                    return Err(RoutingError::Rejected(format!(
                        "routing function for '{}' picked {}, which is not a candidate",
                        route.server_type(),
                        chosen
                    )));
                }
                Ok(chosen)
            }
            None => candidates
                .choose(&mut rand::thread_rng())
                .cloned()
                .ok_or_else(|| RoutingError::NoCandidates(route.server_type().to_string())),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}
