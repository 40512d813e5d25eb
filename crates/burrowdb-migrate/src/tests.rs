use crate::KeyCandidate;
use burrowdb::{
    serialize::{Codec, Json},
    value::Value,
};

#[test]
fn chain_prefers_earlier_candidates() {
    let chain: Vec<KeyCandidate<Json>> = vec![KeyCandidate::decode::<i64>(), KeyCandidate::Text];
    let accept = |key: &[u8]| chain.iter().find_map(|c| c.accept(&Json, key));

    assert_eq!(accept(b"12"), Some(Value::Int(12)));
    assert_eq!(accept(b"hello"), Some(Value::from("hello")));
}

#[test]
fn text_rejects_invalid_utf8() {
    let text = KeyCandidate::<Json>::Text;

    assert_eq!(text.accept(&Json, &[0xff, 0xfe]), None);
    assert_eq!(
        KeyCandidate::<Json>::Bytes.accept(&Json, &[0xff, 0xfe]),
        Some(Value::Blob(vec![0xff, 0xfe]))
    );
}

#[test]
fn decode_candidates_use_the_codec() {
    let candidate = KeyCandidate::<Json>::decode::<u64>();
    let key = Json.encode(&7u64).unwrap();

    assert_eq!(candidate.accept(&Json, &key), Some(Value::Uint(7)));
    assert_eq!(candidate.accept(&Json, b"\"seven\""), None);
    assert_eq!(format!("{candidate:?}"), "Decode(u64)");
}
