//! # Envelopes
//!
//! The request and response messages exchanged for one call. Both are ephemeral:
//! built per invocation, consumed immediately, never retained.
//!
//! They derive serde traits so a network transport can put them on its own wire;
//! the framing of that wire belongs to the transport.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::server::Server;

/// Unknown failure.
pub const CODE_UNKNOWN: &str = "PIT-000";
/// The request was malformed.
pub const CODE_BAD_REQUEST: &str = "PIT-400";
/// The route has no handler on the receiving node.
pub const CODE_NOT_FOUND: &str = "PIT-404";
/// The caller went away before the reply was produced.
pub const CODE_CLIENT_CLOSED_REQUEST: &str = "PIT-499";
/// The handler failed.
pub const CODE_INTERNAL: &str = "PIT-500";

/// Who initiated a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcKind {
    /// Application code calling another node.
    User,
    /// The framework itself (session binding, kicks, ...).
    Sys,
}

impl fmt::Display for RpcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Sys => write!(f, "sys"),
        }
    }
}

/// An application-level failure reported by the node that served the call.
///
/// These are distinct from transport errors: the exchange itself succeeded and the
/// remote side answered with a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    /// Peers that omit the code are read as [`CODE_UNKNOWN`].
    #[serde(default = "unknown_code")]
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn unknown_code() -> String {
    CODE_UNKNOWN.to_string()
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CODE_INTERNAL, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CODE_NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(CODE_BAD_REQUEST, message)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// An inbound or outbound call envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub kind: RpcKind,
    /// The route string as the caller wrote it.
    pub route: String,
    /// Serialized arguments.
    pub payload: Vec<u8>,
    /// Opaque session data, if the call acts on behalf of a client session.
    #[serde(default)]
    pub session: Option<Vec<u8>>,
    /// Propagated call metadata (trace ids, caller info, ...).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// The node that issued the call.
    #[serde(default)]
    pub source: Option<Server>,
}

/// The reply to a [`Request`]: data on success, an error on failure, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub error: Option<RemoteError>,
}

impl Response {
    pub fn ok(data: Vec<u8>) -> Self {
        Self { data, error: None }
    }

    pub fn error(error: RemoteError) -> Self {
        Self {
            data: Vec::new(),
            error: Some(error),
        }
    }

    /// Splits the response into reply bytes or the remote failure.
    pub fn into_result(self) -> std::result::Result<Vec<u8>, RemoteError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_into_result() {
        assert_eq!(Response::ok(vec![1, 2]).into_result(), Ok(vec![1, 2]));

        let err = RemoteError::not_found("no handler");
        assert_eq!(Response::error(err.clone()).into_result(), Err(err));
    }

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::internal("boom").with_metadata("node", "room-1");
        assert_eq!(err.to_string(), "PIT-500: boom");
        assert_eq!(err.metadata.get("node").map(String::as_str), Some("room-1"));
    }

    #[test]
    fn test_response_error_wire_shape() {
        let json = serde_json::to_value(Response::error(RemoteError::bad_request("bad"))).unwrap();
        assert_eq!(json["error"]["code"], "PIT-400");
        assert_eq!(json["error"]["message"], "bad");
    }

    #[test]
    fn test_missing_code_reads_as_unknown() {
        let response: Response = serde_json::from_str(r#"{"error": {"message": "opaque"}}"#).unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code, CODE_UNKNOWN);
        assert_eq!(err.message, "opaque");
    }
}
