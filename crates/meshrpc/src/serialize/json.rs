//! JSON payloads via `serde_json`.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Result;
use super::SerializeError;
use super::Serializer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| SerializeError::Encode {
            codec: self.name(),
            message: e.to_string(),
        })
    }

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| SerializeError::Decode {
            codec: self.name(),
            message: e.to_string(),
        })
    }
}
