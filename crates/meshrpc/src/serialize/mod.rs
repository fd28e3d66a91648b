//! # Serializers
//!
//! Encode call arguments and decode replies.
//!
//! Every node of a cluster must use the same serializer: encoding is deterministic for
//! identical input shapes, which is what makes payloads portable between nodes. Which
//! codec family a deployment uses is a configuration choice, see [`Codec`].

pub mod binary;
pub mod json;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use binary::BinarySerializer;
pub use json::JsonSerializer;

/// Encoding or decoding failures, tagged with the codec that produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    #[error("{codec}: failed to encode: {message}")]
    Encode { codec: &'static str, message: String },
    #[error("{codec}: failed to decode: {message}")]
    Decode { codec: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, SerializeError>;

/// A payload codec.
///
/// Arguments are a single `Serialize` value; several ordered arguments travel as a
/// tuple and "no arguments" as `()`.
pub trait Serializer: Send + Sync + 'static {
    /// Short codec name used in errors and logs.
    fn name(&self) -> &'static str;

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

/// The codec families a node can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// Self-describing JSON.
    #[default]
    Json,
    /// Compact bincode.
    Binary,
}

/// Exhaustive enum of the serializers shipped with the crate, picked at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Json(JsonSerializer),
    Binary(BinarySerializer),
}

impl Codec {
    pub fn from_kind(kind: SerializerKind) -> Self {
        match kind {
            SerializerKind::Json => Self::Json(JsonSerializer),
            SerializerKind::Binary => Self::Binary(BinarySerializer),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::Json(JsonSerializer)
    }
}

impl Serializer for Codec {
    fn name(&self) -> &'static str {
        match self {
            Self::Json(s) => s.name(),
            Self::Binary(s) => s.name(),
        }
    }

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Self::Json(s) => s.marshal(value),
            Self::Binary(s) => s.marshal(value),
        }
    }

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        match self {
            Self::Json(s) => s.unmarshal(data),
            Self::Binary(s) => s.unmarshal(data),
        }
    }
}
