//! # Local Handlers
//!
//! The bridge between the dispatcher and the handlers registered on this node.
//!
//! The dispatcher goes through [`LocalHandler`] both when a caller targets its own
//! node and when the transport server delivers an inbound envelope. Neither path uses
//! network framing: the handler receives the payload bytes as the caller encoded them.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::message::RemoteError;
use crate::message::RpcKind;
use crate::route::Route;
use crate::route::RouteError;
use crate::serialize::Serializer;
use crate::server::Server;

/// Runs a call against the handlers of this node.
///
/// This trait is designed to be object-safe (`Arc<dyn LocalHandler>`).
#[async_trait::async_trait]
pub trait LocalHandler: Send + Sync + 'static {
    /// Executes the handler bound to `call.route` and returns its encoded reply.
    ///
    /// Failures are reported the way a remote node would report them, so a caller
    /// sees the same error whether the call stayed local or not.
    async fn call(&self, call: HandlerCall) -> Result<Vec<u8>, RemoteError>;
}

/// Everything a handler gets to see about a call.
#[derive(Debug, Clone)]
pub struct HandlerCall {
    pub kind: RpcKind,
    pub route: Route,
    pub session: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    /// Metadata the caller attached to its context.
    pub metadata: HashMap<String, String>,
    /// The node that issued the call; this node itself for self calls.
    pub source: Option<Server>,
}

impl HandlerCall {
    pub fn new(kind: RpcKind, route: Route, payload: Vec<u8>) -> Self {
        Self {
            kind,
            route,
            session: None,
            payload,
            metadata: HashMap::new(),
            source: None,
        }
    }

    pub fn with_session(mut self, session: Option<Vec<u8>>) -> Self {
        self.session = session;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_source(mut self, source: Option<Server>) -> Self {
        self.source = source;
        self
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, RemoteError>> + Send>>;

type Handler = Arc<dyn Fn(HandlerCall) -> HandlerFuture + Send + Sync>;

/// A concurrent table of handlers keyed by `service.method`.
///
/// Typed handlers are wrapped with the node's serializer, which must be the one the
/// dispatcher uses.
pub struct HandlerMap<S> {
    serializer: S,
    handlers: DashMap<String, Handler>,
}

impl<S> HandlerMap<S>
where
    S: Serializer + Clone,
{
    pub fn new(serializer: S) -> Self {
        Self {
            serializer,
            handlers: DashMap::new(),
        }
    }

    /// Registers a handler working on raw payload bytes.
    ///
    /// `route` may carry a server type; only `service.method` is used as the key.
    pub fn register_raw<F, Fut>(&self, route: &str, f: F) -> Result<(), RouteError>
    where
        F: Fn(HandlerCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>, RemoteError>> + Send + 'static,
    {
        let route = Route::parse(route)?;
        let handler: Handler = Arc::new(move |call: HandlerCall| -> HandlerFuture { Box::pin(f(call)) });
        self.handlers.insert(route.short(), handler);
        Ok(())
    }

    /// Registers a typed handler: arguments are decoded into `A` and the reply
    /// encoded from `R` with the map's serializer.
    pub fn register<A, R, F, Fut>(&self, route: &str, f: F) -> Result<(), RouteError>
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RemoteError>> + Send + 'static,
    {
        let serializer = self.serializer.clone();
        let f = Arc::new(f);
        self.register_raw(route, move |call: HandlerCall| {
            let serializer = serializer.clone();
            let f = f.clone();
            async move {
                let args: A = serializer
                    .unmarshal(&call.payload)
                    .map_err(|e| RemoteError::bad_request(e.to_string()))?;
                let reply = f(args).await?;
                serializer
                    .marshal(&reply)
                    .map_err(|e| RemoteError::internal(e.to_string()))
            }
        })
    }

    /// Removes the handler bound to `service.method`.
    pub fn unregister(&self, route: &str) -> bool {
        match Route::parse(route) {
            Ok(route) => self.handlers.remove(&route.short()).is_some(),
            Err(_) => false,
        }
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.handlers.contains_key(&route.short())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait::async_trait]
impl<S> LocalHandler for HandlerMap<S>
where
    S: Serializer + Clone,
{
    async fn call(&self, call: HandlerCall) -> Result<Vec<u8>, RemoteError> {
        // clone out of the map so no shard lock is held across the handler's await
        let handler = self
            .handlers
            .get(&call.route.short())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RemoteError::not_found(format!("route not found: {}", call.route)))?;

        handler(call).await
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::message::CODE_BAD_REQUEST;
    use crate::message::CODE_NOT_FOUND;
    use crate::serialize::JsonSerializer;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        text: String,
    }

    fn map() -> HandlerMap<JsonSerializer> {
        let map = HandlerMap::new(JsonSerializer);
        map.register("chat.greet", |name: String| async move {
            Ok::<_, RemoteError>(Greeting { text: format!("hello {}", name) })
        })
        .unwrap();
        map
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let map = map();
        let route = Route::parse("chat.greet").unwrap();
        let payload = JsonSerializer.marshal("ada").unwrap();

        let reply = map.call(HandlerCall::new(RpcKind::User, route, payload)).await.unwrap();
        let greeting: Greeting = JsonSerializer.unmarshal(&reply).unwrap();
        assert_eq!(greeting.text, "hello ada");
    }

    #[tokio::test]
    async fn test_server_type_is_ignored_for_lookup() {
        let map = map();
        let route = Route::parse("room.chat.greet").unwrap();
        let payload = JsonSerializer.marshal("bob").unwrap();
        assert!(map.call(HandlerCall::new(RpcKind::User, route, payload)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let map = map();
        let route = Route::parse("chat.shout").unwrap();
        let err = map.call(HandlerCall::new(RpcKind::User, route, b"null".to_vec())).await.unwrap_err();
        assert_eq!(err.code, CODE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_arguments() {
        let map = map();
        let route = Route::parse("chat.greet").unwrap();
        let err = map.call(HandlerCall::new(RpcKind::User, route, b"{".to_vec())).await.unwrap_err();
        assert_eq!(err.code, CODE_BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_raw_handler_sees_session_and_kind() {
        let map = HandlerMap::new(JsonSerializer);
        map.register_raw("session.bind", |call: HandlerCall| async move {
            assert_eq!(call.kind, RpcKind::Sys);
            Ok::<_, RemoteError>(call.session.unwrap_or_default())
        })
        .unwrap();

        let route = Route::parse("session.bind").unwrap();
        let call = HandlerCall::new(RpcKind::Sys, route, Vec::new()).with_session(Some(b"uid=1".to_vec()));
        let reply = map.call(call).await.unwrap();
        assert_eq!(reply, b"uid=1");
    }

    #[tokio::test]
    async fn test_raw_handler_sees_metadata_and_source() {
        let map = HandlerMap::new(JsonSerializer);
        map.register_raw("trace.echo", |call: HandlerCall| async move {
            let trace = call.metadata.get("trace").cloned().unwrap_or_default();
            let source = call.source.map(|s| s.id).unwrap_or_default();
            Ok::<_, RemoteError>(format!("{}@{}", trace, source).into_bytes())
        })
        .unwrap();

        let mut metadata = HashMap::new();
        metadata.insert("trace".to_string(), "T-1".to_string());
        let call = HandlerCall::new(RpcKind::User, Route::parse("trace.echo").unwrap(), Vec::new())
            .with_metadata(metadata)
            .with_source(Some(Server::new("conn-1", "connector")));

        assert_eq!(map.call(call).await.unwrap(), b"T-1@conn-1");
    }

    #[test]
    fn test_register_rejects_bad_route() {
        let map = HandlerMap::new(JsonSerializer);
        let result = map.register_raw("broken", |_call: HandlerCall| async { Ok::<_, RemoteError>(Vec::new()) });
        assert!(result.is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn test_unregister() {
        let map = map();
        assert_eq!(map.len(), 1);
        assert!(map.unregister("chat.greet"));
        assert!(!map.unregister("chat.greet"));
    }
}
