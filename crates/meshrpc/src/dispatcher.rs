//! # Remote Dispatcher
//!
//! The single entry point for calling a procedure on some node of the cluster.
//!
//! ## Call Path
//!
//! 1. Purely local checks: wiring, reply slot, route grammar, server-type consistency.
//! 2. Target resolution: this node short-circuits to the local handler bridge, any
//!    other node is looked up in service discovery.
//! 3. Encode arguments, run exactly one exchange, decode the reply into the caller's slot.
//!
//! Malformed calls fail in step 1 and never cost a discovery read or a round trip.
//! Nothing is retried and nothing is cached between calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::builder::DispatcherBuilder;
use crate::context::CallContext;
use crate::discovery::DiscoveryError;
use crate::discovery::ServiceDiscovery;
use crate::error::Error;
use crate::error::Result;
use crate::handler::HandlerCall;
use crate::handler::LocalHandler;
use crate::message::RemoteError;
use crate::message::Request;
use crate::message::Response;
use crate::message::RpcKind;
use crate::route::Route;
use crate::router::Router;
use crate::serialize::Codec;
use crate::serialize::Serializer;
use crate::server::Server;
use crate::transport::InboundHandler;
use crate::transport::Transport;

/// Collaborators without which no call can be made.
pub(crate) struct Wiring {
    pub(crate) server: Server,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) discovery: Arc<dyn ServiceDiscovery>,
}

pub(crate) struct Inner<S> {
    pub(crate) wiring: Option<Wiring>,
    pub(crate) serializer: S,
    pub(crate) router: Router,
    pub(crate) local: Option<Arc<dyn LocalHandler>>,
    pub(crate) default_timeout: Option<Duration>,
}

/// Where a validated call is going.
enum Destination {
    Local(Arc<dyn LocalHandler>),
    Remote(Server),
}

/// Validates, resolves, encodes, sends and decodes remote calls.
///
/// Cheap to clone; clones share the same collaborators. Holds no mutable state, so
/// any number of tasks may invoke through it concurrently.
pub struct Dispatcher<S = Codec> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Dispatcher<Codec> {
    pub fn builder() -> DispatcherBuilder<Codec> {
        DispatcherBuilder::new()
    }
}

impl<S: Serializer> Dispatcher<S> {
    pub(crate) fn from_inner(inner: Inner<S>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Whether transport, identity and discovery are all wired.
    pub fn is_initialized(&self) -> bool {
        self.inner.wiring.is_some()
    }

    /// This node's identity, once wired.
    pub fn server(&self) -> Option<&Server> {
        self.inner.wiring.as_ref().map(|w| &w.server)
    }

    pub fn serializer(&self) -> &S {
        &self.inner.serializer
    }

    /// Calls `route` on the node `target_id` and decodes the reply into `out`.
    ///
    /// `out` is written only when the whole call succeeds; on any error it is left
    /// untouched.
    #[tracing::instrument(name = "invoke", skip_all, fields(target = %target_id, route = %route))]
    pub async fn invoke<A, R>(
        &self,
        ctx: &CallContext,
        target_id: &str,
        route: &str,
        out: Option<&mut R>,
        args: &A,
    ) -> Result<()>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ctx, RpcKind::User, Some(target_id), route, out, args).await
    }

    /// Like [`invoke`](Self::invoke), for framework-initiated calls.
    #[tracing::instrument(name = "invoke_sys", skip_all, fields(target = %target_id, route = %route))]
    pub async fn invoke_sys<A, R>(
        &self,
        ctx: &CallContext,
        target_id: &str,
        route: &str,
        out: Option<&mut R>,
        args: &A,
    ) -> Result<()>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ctx, RpcKind::Sys, Some(target_id), route, out, args).await
    }

    /// Calls `route` on any node of the route's server type, chosen by the router.
    #[tracing::instrument(name = "invoke_any", skip_all, fields(route = %route))]
    pub async fn invoke_any<A, R>(
        &self,
        ctx: &CallContext,
        route: &str,
        out: Option<&mut R>,
        args: &A,
    ) -> Result<()>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(ctx, RpcKind::User, None, route, out, args).await
    }

    async fn send<A, R>(
        &self,
        ctx: &CallContext,
        kind: RpcKind,
        target_id: Option<&str>,
        route: &str,
        out: Option<&mut R>,
        args: &A,
    ) -> Result<()>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let result = self.try_send(ctx, kind, target_id, route, out, args).await;
        if let Err(e) = &result {
            tracing::warn!(kind = %kind, error = %e, "rpc failed");
        }
        result
    }

    async fn try_send<A, R>(
        &self,
        ctx: &CallContext,
        kind: RpcKind,
        target_id: Option<&str>,
        route: &str,
        out: Option<&mut R>,
        args: &A,
    ) -> Result<()>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let wiring = self.inner.wiring.as_ref().ok_or(Error::NotInitialized)?;
        let out = out.ok_or(Error::ReplyShouldBePtr)?;
        let route = Route::parse(route)?;

        let destination = match target_id {
            Some(id) => self.resolve_target(wiring, id, &route).await?,
            None => self.resolve_any(wiring, kind, &route).await?,
        };

        let payload = self.inner.serializer.marshal(args)?;
        let ctx = ctx.clone().or_timeout(self.inner.default_timeout);

        let reply = match destination {
            Destination::Local(local) => {
                tracing::debug!(route = %route, "rpc: local short-circuit");
                let call = HandlerCall::new(kind, route, payload)
                    .with_session(ctx.session().map(<[u8]>::to_vec))
                    .with_metadata(ctx.metadata().clone())
                    .with_source(Some(wiring.server.clone()));
                guard(&ctx, local.call(call)).await??
            }
            Destination::Remote(server) => {
                tracing::debug!(route = %route, server = %server, "rpc: sending");
                let call = wiring
                    .transport
                    .call(&ctx, kind, &route, ctx.session(), &payload, &server);
                guard(&ctx, call).await??.into_result()?
            }
        };

        *out = self.inner.serializer.unmarshal(&reply)?;
        Ok(())
    }

    /// Resolves an explicit target ID.
    async fn resolve_target(&self, wiring: &Wiring, id: &str, route: &Route) -> Result<Destination> {
        if id == wiring.server.id {
            if let Some(server_type) = route.explicit_server_type() {
                if server_type != wiring.server.kind {
                    return Err(Error::NonsenseRpc(route.to_string()));
                }
            }
            let local = self.inner.local.clone().ok_or(Error::NoLocalHandler)?;
            return Ok(Destination::Local(local));
        }

        if route.explicit_server_type().is_none() {
            return Err(Error::NoServerTypeChosenForRpc);
        }

        let server = wiring.discovery.get_server(id).await?;
        Ok(Destination::Remote(server))
    }

    /// Resolves "any node serving the route's server type".
    async fn resolve_any(&self, wiring: &Wiring, kind: RpcKind, route: &Route) -> Result<Destination> {
        let server_type = route
            .explicit_server_type()
            .ok_or(Error::NoServerTypeChosenForRpc)?;

        // without a target, naming our own role would just route the call back here
        if server_type == wiring.server.kind {
            return Err(Error::NonsenseRpc(route.to_string()));
        }

        let candidates = wiring.discovery.get_servers_by_type(server_type).await?;
        if candidates.is_empty() {
            return Err(DiscoveryError::NoServersAvailable(server_type.to_string()).into());
        }

        let server = self.inner.router.route(kind, route, &candidates)?;
        Ok(Destination::Remote(server))
    }

    /// Serves one inbound envelope with the local handlers.
    #[tracing::instrument(name = "handle_inbound", skip_all, fields(route = %request.route, kind = %request.kind))]
    pub async fn handle_inbound(&self, request: Request) -> Response {
        match self.serve(request).await {
            Ok(data) => Response::ok(data),
            Err(error) => {
                tracing::debug!(error = %error, "rpc: inbound call failed");
                Response::error(error)
            }
        }
    }

    async fn serve(&self, request: Request) -> std::result::Result<Vec<u8>, RemoteError> {
        let wiring = self
            .inner
            .wiring
            .as_ref()
            .ok_or_else(|| RemoteError::internal(Error::NotInitialized.to_string()))?;

        let route = Route::parse(&request.route).map_err(|e| RemoteError::bad_request(e.to_string()))?;

        if let Some(server_type) = route.explicit_server_type() {
            if server_type != wiring.server.kind {
                return Err(RemoteError::bad_request(format!(
                    "route '{}' targets server type '{}', this node is '{}'",
                    route, server_type, wiring.server.kind
                )));
            }
        }

        let local = self
            .inner
            .local
            .as_ref()
            .ok_or_else(|| RemoteError::not_found(format!("route not found: {}", route)))?;

        let call = HandlerCall::new(request.kind, route, request.payload)
            .with_session(request.session)
            .with_metadata(request.metadata)
            .with_source(request.source);
        local.call(call).await
    }
}

#[async_trait::async_trait]
impl<S: Serializer> InboundHandler for Dispatcher<S> {
    async fn handle(&self, request: Request) -> Response {
        self.handle_inbound(request).await
    }
}

/// Runs `fut` until it completes, the context is cancelled, or its deadline passes.
///
/// Losing the race drops `fut`, which aborts whatever it had in flight.
async fn guard<F, T>(ctx: &CallContext, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(Error::Cancelled),
        _ = sleep_until(ctx.deadline()) => Err(Error::DeadlineExceeded),
        out = fut => Ok(out),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
