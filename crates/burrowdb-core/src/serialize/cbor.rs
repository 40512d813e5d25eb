use crate::serialize::{Codec, SerializeError, check_size};
use serde::{Serialize, de::DeserializeOwned};
use serde_cbor::{from_slice, to_vec};
use std::panic::{AssertUnwindSafe, catch_unwind};

///
/// Cbor
///

#[derive(Clone, Copy, Debug, Default)]
pub struct Cbor;

impl Codec for Cbor {
    fn name(&self) -> &'static str {
        "cbor"
    }

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, SerializeError>
    where
        T: Serialize + ?Sized,
    {
        to_vec(&value).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode CBOR bytes.
    ///
    /// Input size is bounded before decode and a panic inside the decoder is
    /// reported as a decode error.
    fn decode<T>(&self, bytes: &[u8]) -> Result<T, SerializeError>
    where
        T: DeserializeOwned,
    {
        check_size(bytes)?;

        match catch_unwind(AssertUnwindSafe(|| from_slice(bytes))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(SerializeError::Decode(err.to_string())),
            Err(_) => Err(SerializeError::Decode(
                "panic during CBOR deserialization".into(),
            )),
        }
    }
}
