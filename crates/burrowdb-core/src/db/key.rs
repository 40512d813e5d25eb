use crate::{
    db::generation::{Generation, KeyEncoding},
    serialize::{Codec, SerializeError},
    value::{
        Value,
        ordered::{ordered_f64_bytes, ordered_i128_bytes},
    },
};

/// Encode a primary-key, index, or KV key value into its stored bytes.
///
/// Text and blobs are stored raw in every generation. From 0.5 onward,
/// numbers use fixed-width order-preserving forms so byte order matches
/// numeric order; 0.4 hands everything else to the codec.
pub fn encode_key<C: Codec>(
    value: &Value,
    generation: Generation,
    codec: &C,
) -> Result<Vec<u8>, SerializeError> {
    match value {
        Value::Text(text) => return Ok(text.as_bytes().to_vec()),
        Value::Blob(bytes) => return Ok(bytes.clone()),
        _ => {}
    }

    if generation.key_encoding() == KeyEncoding::Codec {
        return codec.encode(value);
    }

    match value {
        Value::Int(_) | Value::Uint(_) | Value::Timestamp(_) => {
            let wide = value.as_i128().unwrap_or_default();
            Ok(ordered_i128_bytes(wide).to_vec())
        }
        Value::Float(v) => Ok(ordered_f64_bytes(*v).to_vec()),
        Value::Bool(v) => Ok(vec![u8::from(*v)]),
        _ => codec.encode(value),
    }
}

///
/// TESTS
///
