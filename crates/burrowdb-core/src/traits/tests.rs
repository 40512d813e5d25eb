use super::*;

#[test]
fn integers_round_trip_across_signedness() {
    assert_eq!(i64::from_value(&Value::Uint(12)), Some(12));
    assert_eq!(u32::from_value(&Value::Int(7)), Some(7));
    assert_eq!(u8::from_value(&Value::Int(-1)), None);
    assert_eq!(i8::from_value(&Value::Uint(300)), None);
}

#[test]
fn options_map_none_to_null() {
    let none: Option<String> = None;
    assert_eq!(none.to_value(), Value::Null);
    assert_eq!(Option::<String>::from_value(&Value::Null), Some(None));
    assert_eq!(
        Option::<String>::from_value(&Value::Text("a".into())),
        Some(Some("a".to_string()))
    );
}

#[test]
fn vectors_become_lists() {
    let value = vec![1i64, 2].to_value();
    assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(Vec::<i64>::from_value(&value), Some(vec![1, 2]));
}

#[test]
fn byte_buffers_become_blobs() {
    let buf = ByteBuf::from(vec![1u8, 2, 3]);
    assert_eq!(buf.to_value(), Value::Blob(vec![1, 2, 3]));
}

#[test]
fn timestamps_keep_nanosecond_precision() {
    let at = OffsetDateTime::from_unix_timestamp_nanos(1_600_000_000_123_456_789).unwrap();
    let value = at.to_value();

    assert_eq!(value, Value::Timestamp(1_600_000_000_123_456_789));
    assert_eq!(OffsetDateTime::from_value(&value), Some(at));
}

#[test]
fn mismatched_kinds_do_not_convert() {
    assert_eq!(String::from_value(&Value::Int(1)), None);
    assert_eq!(bool::from_value(&Value::Text("true".into())), None);
}
