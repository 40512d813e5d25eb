//! Typed executors over one model's record store and indexes.

mod delete;
mod load;
mod save;

#[cfg(test)]
mod tests;

pub use delete::DeleteExecutor;
pub use load::LoadExecutor;
pub use save::SaveExecutor;

use crate::{
    db::{Db, key::encode_key},
    error::Error,
    serialize::Codec,
    traits::Model,
};

/// Encoded index value of `field` on `record`; `None` for zero values,
/// which are never indexed.
fn indexed_bytes<C: Codec, T: Model>(
    db: &Db<C>,
    record: &T,
    field: &str,
) -> Result<Option<Vec<u8>>, Error> {
    match record.get_value(field) {
        Some(value) if !value.is_zero() => {
            Ok(Some(encode_key(&value, db.generation(), db.codec())?))
        }
        _ => Ok(None),
    }
}

fn decode<C: Codec, T: Model>(db: &Db<C>, bytes: &[u8]) -> Result<T, Error> {
    Ok(db.codec().decode(bytes)?)
}

fn rows(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
