//! # In-Memory Bus
//!
//! A transport that never leaves the process. Nodes register their inbound handler
//! on a shared [`MemoryBus`] and call each other through per-node [`MemoryTransport`]s.
//!
//! Useful for tests and single-process clusters. Delivery follows the same contract
//! as a network transport: one inbound message per call, handled on its own task.
//! When the caller stops waiting (cancelled, timed out or dropped) the receiving side
//! abandons the handler and answers `PIT-499`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::context::CallContext;
use crate::message::CODE_CLIENT_CLOSED_REQUEST;
use crate::message::RemoteError;
use crate::message::Request;
use crate::message::Response;
use crate::message::RpcKind;
use crate::route::Route;
use crate::server::Server;
use crate::transport;
use crate::transport::InboundHandler;
use crate::transport::Transport;
use crate::transport::TransportError;

/// The shared medium: server ID -> inbound handler.
#[derive(Clone, Default)]
pub struct MemoryBus {
    nodes: Arc<DashMap<String, Arc<dyn InboundHandler>>>,
    max_payload: Option<usize>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects payloads larger than `bytes` with [`TransportError::PayloadTooLarge`].
    pub fn with_max_payload(mut self, bytes: usize) -> Self {
        self.max_payload = Some(bytes);
        self
    }

    /// Attaches the receiving side of node `server_id`.
    pub fn bind(&self, server_id: impl Into<String>, handler: Arc<dyn InboundHandler>) {
        let server_id = server_id.into();
        tracing::debug!(server = %server_id, "memory bus: node bound");
        self.nodes.insert(server_id, handler);
    }

    /// Detaches a node; calls to it fail with [`TransportError::Unreachable`].
    pub fn unbind(&self, server_id: &str) -> bool {
        self.nodes.remove(server_id).is_some()
    }

    /// The client side for calls issued by `source`.
    pub fn transport_for(&self, source: Server) -> MemoryTransport {
        MemoryTransport {
            bus: self.clone(),
            source,
        }
    }
}

/// Client side of the bus for one node.
#[derive(Clone)]
pub struct MemoryTransport {
    bus: MemoryBus,
    source: Server,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn call(
        &self,
        ctx: &CallContext,
        kind: RpcKind,
        route: &Route,
        session: Option<&[u8]>,
        payload: &[u8],
        target: &Server,
    ) -> transport::Result<Response> {
        let handler = self
            .bus
            .nodes
            .get(&target.id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::Unreachable(target.id.clone()))?;

        if self.bus.max_payload.is_some_and(|limit| payload.len() > limit) {
            return Err(TransportError::PayloadTooLarge);
        }

        let request = Request {
            kind,
            route: route.to_string(),
            payload: payload.to_vec(),
            session: session.map(<[u8]>::to_vec),
            metadata: ctx.metadata().clone(),
            source: Some(self.source.clone()),
        };

        // cancelled when this call returns or is dropped, whichever way it ends
        let caller = CancellationToken::new();
        let _caller_gone = caller.clone().drop_guard();

        let delivery = tokio::spawn(deliver(handler, request, caller));
        let deadline = ctx.deadline();

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(TransportError::ConnectionLost("call cancelled".into())),
            _ = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => Err(TransportError::Timeout),
            joined = delivery => joined.map_err(|e| TransportError::ConnectionLost(e.to_string())),
        }
    }
}

/// Runs the receiving side of one call until it answers or the caller goes away.
async fn deliver(handler: Arc<dyn InboundHandler>, request: Request, caller: CancellationToken) -> Response {
    let route = request.route.clone();
    tokio::select! {
        response = handler.handle(request) => response,
        _ = caller.cancelled() => {
            tracing::debug!(route = %route, "memory bus: caller went away, abandoning call");
            Response::error(RemoteError::new(CODE_CLIENT_CLOSED_REQUEST, "caller went away"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;

    /// Echoes the payload back and records the request's source and metadata.
    struct Echo;

    #[async_trait::async_trait]
    impl InboundHandler for Echo {
        async fn handle(&self, request: Request) -> Response {
            let source = request.source.map(|s| s.id).unwrap_or_default();
            let trace = request.metadata.get("trace").cloned().unwrap_or_default();
            let mut data = format!("{}|{}|", source, trace).into_bytes();
            data.extend_from_slice(&request.payload);
            Response::ok(data)
        }
    }

    /// Never answers.
    struct Silent;

    #[async_trait::async_trait]
    impl InboundHandler for Silent {
        async fn handle(&self, _request: Request) -> Response {
            std::future::pending().await
        }
    }

    fn route() -> Route {
        Route::parse("room.echo.say").unwrap()
    }

    #[tokio::test]
    async fn test_delivers_to_bound_node() {
        let bus = MemoryBus::new();
        bus.bind("room-1", Arc::new(Echo));

        let transport = bus.transport_for(Server::new("conn-1", "connector"));
        let ctx = CallContext::new().with_metadata("trace", "t1");
        let response = transport
            .call(&ctx, RpcKind::User, &route(), None, b"hi", &Server::new("room-1", "room"))
            .await
            .expect("delivered");

        assert_eq!(response.into_result().unwrap(), b"conn-1|t1|hi");
    }

    #[tokio::test]
    async fn test_unbound_node_is_unreachable() {
        let bus = MemoryBus::new();
        let transport = bus.transport_for(Server::new("conn-1", "connector"));
        let err = transport
            .call(&CallContext::new(), RpcKind::User, &route(), None, b"", &Server::new("room-9", "room"))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Unreachable("room-9".into()));
    }

    #[tokio::test]
    async fn test_deadline_is_honored() {
        let bus = MemoryBus::new();
        bus.bind("room-1", Arc::new(Silent));

        let transport = bus.transport_for(Server::new("conn-1", "connector"));
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));
        let err = transport
            .call(&ctx, RpcKind::User, &route(), None, b"", &Server::new("room-1", "room"))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout);
    }

    #[tokio::test]
    async fn test_cancellation_is_honored() {
        let bus = MemoryBus::new();
        bus.bind("room-1", Arc::new(Silent));

        let transport = bus.transport_for(Server::new("conn-1", "connector"));
        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = transport
            .call(&ctx, RpcKind::User, &route(), None, b"", &Server::new("room-1", "room"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionLost(_)));
    }

    /// Never answers; flips `abandoned` when its work is dropped.
    struct Tracked {
        abandoned: Arc<AtomicBool>,
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl InboundHandler for Tracked {
        async fn handle(&self, _request: Request) -> Response {
            let _flag = SetOnDrop(self.abandoned.clone());
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_oversized_payload_is_rejected() {
        let bus = MemoryBus::new().with_max_payload(4);
        bus.bind("room-1", Arc::new(Echo));

        let transport = bus.transport_for(Server::new("conn-1", "connector"));
        let target = Server::new("room-1", "room");
        let err = transport
            .call(&CallContext::new(), RpcKind::User, &route(), None, b"too long", &target)
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::PayloadTooLarge);

        assert!(transport
            .call(&CallContext::new(), RpcKind::User, &route(), None, b"ok", &target)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_receiver_answers_client_closed_when_caller_is_gone() {
        let caller = CancellationToken::new();
        caller.cancel();

        let request = Request {
            kind: RpcKind::User,
            route: "room.echo.say".into(),
            payload: Vec::new(),
            session: None,
            metadata: Default::default(),
            source: None,
        };
        let response = deliver(Arc::new(Silent), request, caller).await;
        assert_eq!(response.into_result().unwrap_err().code, CODE_CLIENT_CLOSED_REQUEST);
    }

    #[tokio::test]
    async fn test_timed_out_call_abandons_the_handler() {
        let abandoned = Arc::new(AtomicBool::new(false));
        let bus = MemoryBus::new();
        bus.bind("room-1", Arc::new(Tracked { abandoned: abandoned.clone() }));

        let transport = bus.transport_for(Server::new("conn-1", "connector"));
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));
        let err = transport
            .call(&ctx, RpcKind::User, &route(), None, b"", &Server::new("room-1", "room"))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !abandoned.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("handler should be dropped once the caller gives up");
    }

    #[test]
    fn test_unbind() {
        let bus = MemoryBus::new();
        bus.bind("room-1", Arc::new(Echo));
        assert!(bus.unbind("room-1"));
        assert!(!bus.unbind("room-1"));
    }
}
