use crate::serialize::{Codec, SerializeError, check_size};
use serde::{Serialize, de::DeserializeOwned};

///
/// Json
///
/// The default codec.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct Json;

impl Codec for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, SerializeError>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_vec(value).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    fn decode<T>(&self, bytes: &[u8]) -> Result<T, SerializeError>
    where
        T: DeserializeOwned,
    {
        check_size(bytes)?;

        serde_json::from_slice(bytes).map_err(|e| SerializeError::Decode(e.to_string()))
    }
}
