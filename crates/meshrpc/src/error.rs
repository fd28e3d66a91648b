//! # Error Definitions
//!
//! Everything an invocation can fail with. The dispatcher produces the validation
//! kinds itself; collaborator failures arrive wrapped in the variant that names their
//! source, otherwise untouched.

use crate::discovery::DiscoveryError;
use crate::message::RemoteError;
use crate::route::RouteError;
use crate::router::RoutingError;
use crate::serialize::SerializeError;
use crate::transport::TransportError;

/// Failures of a single invocation. All of them are terminal for that call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The dispatcher was used before its transport, identity and discovery were wired.
    #[error("rpc server not initialized")]
    NotInitialized,
    /// No writable reply slot was supplied.
    #[error("reply should be a writable slot")]
    ReplyShouldBePtr,
    #[error(transparent)]
    Route(#[from] RouteError),
    /// A call to another node did not say which server type serves it.
    #[error("no server type chosen for rpc, routes to other nodes need 'serverType.service.method'")]
    NoServerTypeChosenForRpc,
    /// The call targets this node while naming a different server type.
    #[error("nonsense rpc: this node cannot serve route '{0}'")]
    NonsenseRpc(String),
    /// A call targets this node but no local handler bridge is installed.
    #[error("no local handler installed for self-targeted calls")]
    NoLocalHandler,
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Serialization(#[from] SerializeError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The serving node answered with an application error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
    /// The caller cancelled the context before a reply arrived.
    #[error("call cancelled")]
    Cancelled,
    /// The context deadline passed before a reply arrived.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Fieldless classification of [`Error`], convenient for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotInitialized,
    ReplyShouldBePtr,
    InvalidRoute,
    NoServerTypeChosenForRpc,
    NonsenseRpc,
    NoLocalHandler,
    ServerNotFound,
    NoServersAvailable,
    Discovery,
    Routing,
    Serialization,
    Transport,
    Remote,
    Cancelled,
    DeadlineExceeded,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::ReplyShouldBePtr => ErrorKind::ReplyShouldBePtr,
            Self::Route(_) => ErrorKind::InvalidRoute,
            Self::NoServerTypeChosenForRpc => ErrorKind::NoServerTypeChosenForRpc,
            Self::NonsenseRpc(_) => ErrorKind::NonsenseRpc,
            Self::NoLocalHandler => ErrorKind::NoLocalHandler,
            Self::Discovery(DiscoveryError::ServerNotFound(_)) => ErrorKind::ServerNotFound,
            Self::Discovery(DiscoveryError::NoServersAvailable(_)) => ErrorKind::NoServersAvailable,
            Self::Discovery(_) => ErrorKind::Discovery,
            Self::Routing(_) => ErrorKind::Routing,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Remote(_) => ErrorKind::Remote,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
