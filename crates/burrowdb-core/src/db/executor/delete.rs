use crate::{
    db::{
        Db,
        engine::WriteTx,
        executor::{decode, indexed_bytes},
        index::IndexStore,
        key::encode_key,
        store::RecordStore,
    },
    error::Error,
    model::ModelInfo,
    obs::sink::{self, ExecKind, MetricsEvent, Span},
    serialize::Codec,
    traits::{FieldValue, Model},
    value::Value,
};
use std::marker::PhantomData;

///
/// DeleteExecutor
///

pub struct DeleteExecutor<'a, C: Codec, T: Model> {
    db: &'a Db<C>,
    _marker: PhantomData<T>,
}

impl<'a, C: Codec, T: Model> DeleteExecutor<'a, C, T> {
    #[must_use]
    pub(crate) const fn new(db: &'a Db<C>) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }

    /// Remove one record and its index entries. `NotFound` when absent.
    pub fn delete(&self, key: impl FieldValue) -> Result<(), Error> {
        self.db.update(|tx| self.delete_in(tx, &key.to_value()))
    }

    pub fn delete_in(&self, tx: &WriteTx, key: &Value) -> Result<(), Error> {
        let info = ModelInfo::of::<T>()?;
        let mut span = Span::new(ExecKind::Delete, T::NAME);
        let store = RecordStore::new(info.name);
        let key = encode_key(key, self.db.generation(), self.db.codec())?;

        let bytes = store.get(tx, &key)?.ok_or(Error::NotFound)?;
        let record: T = decode(self.db, &bytes)?;

        let mut removes = 0;
        for index in IndexStore::all_for(&info, self.db.generation()) {
            if let Some(value) = indexed_bytes(self.db, &record, index.field())?
                && index.remove(tx, &value, &key)?
            {
                removes += 1;
            }
        }
        store.remove(tx, &key)?;

        sink::record(MetricsEvent::IndexDelta {
            model: T::NAME,
            inserts: 0,
            removes,
        });
        span.set_rows(1);

        Ok(())
    }

    /// Drop the model's bucket with every record, index, and sequence.
    /// `NotFound` when the bucket does not exist.
    pub fn drop(&self) -> Result<(), Error> {
        self.db.update(|tx| self.drop_in(tx))
    }

    pub fn drop_in(&self, tx: &WriteTx) -> Result<(), Error> {
        let _span = Span::new(ExecKind::Delete, T::NAME);

        if tx.drop_bucket(T::NAME)? {
            self.db.debug_log(format!("dropped bucket {}", T::NAME));
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }
}
