#[cfg(test)]
mod tests;

use crate::{model::FieldSpec, value::Value};
use serde::{Serialize, de::DeserializeOwned};
use serde_bytes::ByteBuf;
use time::OffsetDateTime;

/// ============================================================================
/// MODEL TRAITS
/// ============================================================================

///
/// Schema
///
/// Static field description of a struct: names, visibility, annotations, and
/// the nested description of inline fields. Usually derived.
///

pub trait Schema {
    const FIELDS: &'static [FieldSpec];
}

///
/// FieldValues
///
/// Name-based access to the visible fields of a struct, including the
/// flattened fields of inline children.
///

pub trait FieldValues {
    fn get_value(&self, field: &str) -> Option<Value>;

    /// Assign a field from a dynamic value. Returns false when the field is
    /// unknown or the value does not convert to the field's type.
    fn set_value(&mut self, field: &str, value: &Value) -> bool;
}

///
/// Model
///
/// A record type stored in its own bucket.
///

pub trait Model: Schema + FieldValues + Serialize + DeserializeOwned + 'static {
    /// Bucket name.
    const NAME: &'static str;
}

impl<T: Schema> Schema for Box<T> {
    const FIELDS: &'static [FieldSpec] = T::FIELDS;
}

impl<T: FieldValues> FieldValues for Box<T> {
    fn get_value(&self, field: &str) -> Option<Value> {
        (**self).get_value(field)
    }

    fn set_value(&mut self, field: &str, value: &Value) -> bool {
        (**self).set_value(field, value)
    }
}

/// ============================================================================
/// FIELD VALUES
/// ============================================================================

///
/// FieldValue
///
/// Conversion between a concrete field type and its dynamic `Value`.
///

pub trait FieldValue {
    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>
    where
        Self: Sized;
}

impl FieldValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }

    fn from_value(_value: &Value) -> Option<Self> {
        None
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[expect(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v as Self),
            _ => None,
        }
    }
}

impl FieldValue for ByteBuf {
    fn to_value(&self) -> Value {
        Value::Blob(self.to_vec())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(v) => Some(Self::from(v.clone())),
            _ => None,
        }
    }
}

impl FieldValue for OffsetDateTime {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.unix_timestamp_nanos())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(nanos) => Self::from_unix_timestamp_nanos(*nanos).ok(),
            _ => None,
        }
    }
}

impl FieldValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn from_value(value: &Value) -> Option<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

// impl_field_value_int
// Integers accept either signedness on the way back, as long as the
// number fits.
macro_rules! impl_field_value_int {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl FieldValue for $type {
                fn to_value(&self) -> Value {
                    Value::$variant((*self).into())
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => (*v).try_into().ok(),
                        Value::Uint(v) => (*v).try_into().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_field_value_int!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
);
