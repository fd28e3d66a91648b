//! # meshrpc
//!
//! Route-addressed remote invocation between the nodes of a server cluster.
//!
//! A call names a procedure with a dotted route (`serverType.service.method`), a
//! target node (or just a server type), an argument value and a reply slot. The
//! [`Dispatcher`] validates the call, resolves the target through [`ServiceDiscovery`],
//! encodes the arguments with a [`Serializer`], runs one exchange over a [`Transport`]
//! and decodes the reply into the slot, or fails with a typed [`Error`].
//!
//! Transport, discovery and serializer are traits; the crate ships in-process
//! implementations ([`MemoryBus`], [`StaticDiscovery`], [`JsonSerializer`],
//! [`BinarySerializer`]) that need no running cluster.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use meshrpc::*;
//! # async fn example() -> Result<()> {
//! let bus = MemoryBus::new();
//! let me = Server::new("conn-1", "connector");
//! let discovery = Arc::new(StaticDiscovery::with_servers([Server::new("room-1", "room")]));
//!
//! let dispatcher = Dispatcher::builder()
//!     .server(me.clone())
//!     .transport(Arc::new(bus.transport_for(me)))
//!     .discovery(discovery)
//!     .build();
//!
//! let mut members: Vec<String> = Vec::new();
//! dispatcher
//!     .invoke(&CallContext::new(), "room-1", "room.lobby.members", Some(&mut members), &())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod memory;
pub mod message;
pub mod route;
pub mod router;
pub mod serialize;
pub mod server;
pub mod transport;

pub use builder::DispatcherBuilder;
pub use config::Config;
pub use context::CallContext;
pub use discovery::DiscoveryError;
pub use discovery::ServiceDiscovery;
pub use discovery::StaticDiscovery;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use error::ErrorKind;
pub use error::Result;
pub use handler::HandlerCall;
pub use handler::HandlerMap;
pub use handler::LocalHandler;
pub use memory::MemoryBus;
pub use memory::MemoryTransport;
pub use message::RemoteError;
pub use message::Request;
pub use message::Response;
pub use message::RpcKind;
pub use route::Route;
pub use route::RouteError;
pub use router::Router;
pub use router::RoutingError;
pub use serialize::BinarySerializer;
pub use serialize::Codec;
pub use serialize::JsonSerializer;
pub use serialize::SerializeError;
pub use serialize::Serializer;
pub use serialize::SerializerKind;
pub use server::Server;
pub use transport::InboundHandler;
pub use transport::Transport;
pub use transport::TransportError;
