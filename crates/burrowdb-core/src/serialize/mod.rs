mod cbor;
mod json;


use crate::error::ErrorClass;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

pub use cbor::Cbor;
pub use json::Json;

/// Upper bound on a single encoded payload accepted for decoding.
pub const MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    SizeLimitExceeded { len: usize, max: usize },
}

impl SerializeError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::Encode(_) => ErrorClass::Internal,
            Self::Decode(_) | Self::SizeLimitExceeded { .. } => ErrorClass::Corruption,
        }
    }
}

///
/// Codec
///
/// Byte-level marshalling of records, KV values, and (in the oldest
/// generation) non-string keys. Implementations are swappable per database.
///

pub trait Codec: Clone + Send + Sync + 'static {
    /// Short stable name, persisted in per-bucket configuration entries.
    fn name(&self) -> &'static str;

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, SerializeError>
    where
        T: Serialize + ?Sized;

    fn decode<T>(&self, bytes: &[u8]) -> Result<T, SerializeError>
    where
        T: DeserializeOwned;
}

fn check_size(bytes: &[u8]) -> Result<(), SerializeError> {
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(SerializeError::SizeLimitExceeded {
            len: bytes.len(),
            max: MAX_PAYLOAD_BYTES,
        });
    }

    Ok(())
}
