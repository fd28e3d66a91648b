//! Compact binary payloads via `bincode`.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Result;
use super::SerializeError;
use super::Serializer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinarySerializer;

impl Serializer for BinarySerializer {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| SerializeError::Encode {
            codec: self.name(),
            message: e.to_string(),
        })
    }

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        bincode::deserialize(data).map_err(|e| SerializeError::Decode {
            codec: self.name(),
            message: e.to_string(),
        })
    }
}
