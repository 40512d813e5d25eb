use crate::{
    db::{
        Db,
        engine::{Read, WriteTx},
        executor::{decode, indexed_bytes},
        index::IndexStore,
        key::encode_key,
        store::RecordStore,
    },
    error::Error,
    model::ModelInfo,
    obs::sink::{self, ExecKind, MetricsEvent, Span},
    serialize::Codec,
    traits::Model,
    value::Value,
};
use std::marker::PhantomData;

///
/// SaveExecutor
///
/// Atomicity invariant:
/// Every unique check runs before the first index or record write, and all
/// writes share the caller's transaction, so a failed save leaves nothing
/// behind once the transaction aborts.
///

pub struct SaveExecutor<'a, C: Codec, T: Model> {
    db: &'a Db<C>,
    _marker: PhantomData<T>,
}

///
/// IndexChange
///
/// Old and new encoded value of one index for one save.
///

struct IndexChange {
    index: IndexStore,
    old: Option<Vec<u8>>,
    new: Option<Vec<u8>>,
}

impl<'a, C: Codec, T: Model> SaveExecutor<'a, C, T> {
    #[must_use]
    pub(crate) const fn new(db: &'a Db<C>) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }

    // ─────────────────────────────────────────────
    // Save
    // ─────────────────────────────────────────────

    /// Insert or replace `record` in its own transaction. A zero integer
    /// primary key is assigned from the sequence when auto-increment is on.
    pub fn save(&self, record: &mut T) -> Result<(), Error> {
        self.db.update(|tx| self.save_in(tx, record))
    }

    /// Save several records atomically.
    pub fn save_many(&self, records: &mut [T]) -> Result<(), Error> {
        self.db.update(|tx| {
            records
                .iter_mut()
                .try_for_each(|record| self.save_in(tx, record))
        })
    }

    pub fn save_in(&self, tx: &WriteTx, record: &mut T) -> Result<(), Error> {
        let info = ModelInfo::of::<T>()?;
        let mut span = Span::new(ExecKind::Save, T::NAME);
        let store = RecordStore::new(info.name);

        store.ensure(
            tx,
            self.db.generation(),
            self.db.codec(),
            self.db.config().auto_increment,
        )?;

        let pk = self.assign_key(tx, &info, &store, record)?;
        let key = encode_key(&pk, self.db.generation(), self.db.codec())?;
        let old: Option<T> = match store.get(tx, &key)? {
            Some(bytes) => Some(decode(self.db, &bytes)?),
            None => None,
        };

        // validation phase
        let changes = self.plan_changes(&info, old.as_ref(), record)?;
        for change in &changes {
            if let Some(new) = &change.new
                && change.old.as_ref() != Some(new)
            {
                change.index.check_unique(tx, new, &key)?;
            }
        }

        // mutation phase
        let (mut inserts, mut removes) = (0, 0);
        for change in &changes {
            change.index.create(tx)?;
            if change.old == change.new {
                continue;
            }
            if let Some(old) = &change.old
                && change.index.remove(tx, old, &key)?
            {
                removes += 1;
            }
            if let Some(new) = &change.new {
                change.index.insert(tx, new, &key)?;
                inserts += 1;
            }
        }

        store.put(tx, &key, &self.db.codec().encode(record)?)?;

        sink::record(MetricsEvent::IndexDelta {
            model: T::NAME,
            inserts,
            removes,
        });
        span.set_rows(1);
        self.db.debug_log(format!(
            "saved {} (index +{inserts} -{removes})",
            T::NAME
        ));

        Ok(())
    }

    fn assign_key(
        &self,
        tx: &WriteTx,
        info: &ModelInfo,
        store: &RecordStore<'_>,
        record: &mut T,
    ) -> Result<Value, Error> {
        let pk = record
            .get_value(info.primary_key)
            .ok_or(Error::NoPrimaryKeyField(info.name))?;
        let auto_increment = self.db.config().auto_increment;

        if !pk.is_zero() {
            if auto_increment
                && let Some(n) = pk.as_i128().and_then(|n| u64::try_from(n).ok())
                && pk.is_integer()
            {
                store.observe_sequence(tx, n)?;
            }
            return Ok(pk);
        }

        if !(auto_increment && pk.is_integer()) {
            return Err(Error::MissingPrimaryKey(info.name));
        }

        let assigned = Value::Uint(store.next_sequence(tx)?);
        if !record.set_value(info.primary_key, &assigned) {
            return Err(Error::MissingPrimaryKey(info.name));
        }

        Ok(assigned)
    }

    fn plan_changes(
        &self,
        info: &ModelInfo,
        old: Option<&T>,
        new: &T,
    ) -> Result<Vec<IndexChange>, Error> {
        IndexStore::all_for(info, self.db.generation())
            .into_iter()
            .map(|index| {
                let old = match old {
                    Some(old) => indexed_bytes(self.db, old, index.field())?,
                    None => None,
                };
                let new = indexed_bytes(self.db, new, index.field())?;

                Ok(IndexChange { index, old, new })
            })
            .collect()
    }

    // ─────────────────────────────────────────────
    // Bucket maintenance
    // ─────────────────────────────────────────────

    /// Create the record bucket and every index bucket.
    pub fn init(&self) -> Result<(), Error> {
        self.db.update(|tx| self.init_in(tx))
    }

    pub fn init_in(&self, tx: &WriteTx) -> Result<(), Error> {
        let info = ModelInfo::of::<T>()?;

        RecordStore::new(info.name).ensure(
            tx,
            self.db.generation(),
            self.db.codec(),
            self.db.config().auto_increment,
        )?;
        for index in IndexStore::all_for(&info, self.db.generation()) {
            index.create(tx)?;
        }

        Ok(())
    }

    /// Drop every index bucket of the model and rebuild them from the stored
    /// records. A model without a bucket is left alone.
    pub fn reindex(&self) -> Result<(), Error> {
        self.db.update(|tx| self.reindex_in(tx))
    }

    pub fn reindex_in(&self, tx: &WriteTx) -> Result<(), Error> {
        let info = ModelInfo::of::<T>()?;
        let store = RecordStore::new(info.name);
        if !store.exists(tx)? {
            return Ok(());
        }

        let prefix = info.index_bucket_prefix();
        for bucket in tx.buckets()? {
            if bucket.starts_with(&prefix) {
                tx.drop_bucket(&bucket)?;
            }
        }

        let indexes = IndexStore::all_for(&info, self.db.generation());
        for index in &indexes {
            index.create(tx)?;
        }

        let entries = store.entries(tx)?;
        let mut inserts = 0;
        for (key, bytes) in &entries {
            let record: T = decode(self.db, bytes)?;
            for index in &indexes {
                if let Some(value) = indexed_bytes(self.db, &record, index.field())? {
                    index.insert(tx, &value, key)?;
                    inserts += 1;
                }
            }
        }

        sink::record(MetricsEvent::IndexDelta {
            model: T::NAME,
            inserts,
            removes: 0,
        });
        self.db.debug_log(format!(
            "reindexed {} ({} records, {inserts} entries)",
            T::NAME,
            entries.len()
        ));

        Ok(())
    }
}
