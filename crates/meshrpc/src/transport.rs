//! # Transport Abstraction
//!
//! A minimal, async interface for moving one call envelope to a node and its reply back.
//!
//! ## Philosophy
//!
//! - **Payload-Opaque**: The transport never decodes the payload. It frames the envelope
//!   for its own wire and hands back whatever the remote node answered.
//! - **Request-Response**: One `call` is exactly one exchange. Retries, backoff and
//!   circuit breaking belong to whoever wraps the transport, never to the transport
//!   behind the caller's back.
//! - **Cancellable**: Implementations must stop waiting when the context is cancelled
//!   or its deadline passes.

use crate::context::CallContext;
use crate::message::Request;
use crate::message::Response;
use crate::message::RpcKind;
use crate::route::Route;
use crate::server::Server;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer is unreachable or the connection was dropped.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// No route to the target node exists on this transport.
    #[error("node unreachable: {0}")]
    Unreachable(String),
    /// The operation timed out before a response was received.
    #[error("request timed out")]
    Timeout,
    /// The remote peer rejected the payload size.
    #[error("payload too large for transport")]
    PayloadTooLarge,
    /// Generic I/O error or internal transport failure.
    #[error("i/o error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// The client side of a transport: sends a call to a node and waits for the reply.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one call envelope to `target` and waits for its response.
    ///
    /// # invariants
    /// - Must return `Ok(response)` whenever the remote node answered, including when
    ///   the answer is an application error.
    /// - Must return `Err` if the exchange itself failed.
    /// - Must not retry internally.
    async fn call(
        &self,
        ctx: &CallContext,
        kind: RpcKind,
        route: &Route,
        session: Option<&[u8]>,
        payload: &[u8],
        target: &Server,
    ) -> Result<Response>;
}

/// The server side of a transport: what it feeds every inbound envelope to.
///
/// A transport server must hand each inbound message to `handle` exactly once and
/// ship the returned response back to the caller.
#[async_trait::async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Response;
}
