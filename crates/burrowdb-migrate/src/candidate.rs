use burrowdb::{serialize::Codec, traits::FieldValue, value::Value};
use serde::de::DeserializeOwned;
use std::{any::type_name, fmt};

///
/// KeyCandidate
///
/// One way to read a stored 0.4 key back into its logical value. Buckets
/// register an ordered chain; the first candidate that accepts a key wins.
///

pub enum KeyCandidate<C: Codec> {
    /// Accept any key as raw bytes.
    Bytes,

    /// Accept keys that are valid UTF-8.
    Text,

    /// Accept keys the codec decodes into a specific type.
    Decode {
        type_name: &'static str,
        decode: fn(&C, &[u8]) -> Option<Value>,
    },
}

impl<C: Codec> KeyCandidate<C> {
    /// Candidate for keys written as codec-encoded `T`.
    #[must_use]
    pub fn decode<T>() -> Self
    where
        T: FieldValue + DeserializeOwned,
    {
        Self::Decode {
            type_name: type_name::<T>(),
            decode: |codec, bytes| codec.decode::<T>(bytes).ok().map(|v| v.to_value()),
        }
    }

    /// Logical value of `key`, or `None` when this candidate rejects it.
    #[must_use]
    pub fn accept(&self, codec: &C, key: &[u8]) -> Option<Value> {
        match self {
            Self::Bytes => Some(Value::Blob(key.to_vec())),
            Self::Text => std::str::from_utf8(key)
                .ok()
                .map(|text| Value::Text(text.to_string())),
            Self::Decode { decode, .. } => decode(codec, key),
        }
    }
}

impl<C: Codec> Clone for KeyCandidate<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Bytes => Self::Bytes,
            Self::Text => Self::Text,
            Self::Decode { type_name, decode } => Self::Decode {
                type_name: *type_name,
                decode: *decode,
            },
        }
    }
}

impl<C: Codec> fmt::Debug for KeyCandidate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes => f.write_str("Bytes"),
            Self::Text => f.write_str("Text"),
            Self::Decode { type_name, .. } => write!(f, "Decode({type_name})"),
        }
    }
}
