use crate::{
    db::{
        Db,
        engine::{Read, Walk},
        executor::{decode, rows},
        index::IndexStore,
        key::encode_key,
        options::{Admit, QueryOptions},
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
/// LoadExecutor
///
/// Read paths for one model. Every method has an `_in` form that runs inside
/// a caller-supplied transaction.
///

pub struct LoadExecutor<'a, C: Codec, T: Model> {
    db: &'a Db<C>,
    _marker: PhantomData<T>,
}

impl<'a, C: Codec, T: Model> LoadExecutor<'a, C, T> {
    #[must_use]
    pub(crate) const fn new(db: &'a Db<C>) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }

    // ─────────────────────────────────────────────
    // Primary key
    // ─────────────────────────────────────────────

    /// Fetch one record by primary key.
    pub fn get(&self, key: impl FieldValue) -> Result<T, Error> {
        self.db.view(|tx| self.get_in(tx, &key.to_value()))
    }

    pub fn get_in(&self, tx: &impl Read, key: &Value) -> Result<T, Error> {
        let mut span = Span::new(ExecKind::Load, T::NAME);
        let key = encode_key(key, self.db.generation(), self.db.codec())?;

        let bytes = RecordStore::new(T::NAME)
            .get(tx, &key)?
            .ok_or(Error::NotFound)?;
        span.set_rows(1);

        decode(self.db, &bytes)
    }

    // ─────────────────────────────────────────────
    // Full scans
    // ─────────────────────────────────────────────

    /// Every record in primary-key order. An absent bucket reads as empty.
    pub fn all(&self, options: QueryOptions) -> Result<Vec<T>, Error> {
        self.db.view(|tx| self.all_in(tx, options))
    }

    pub fn all_in(&self, tx: &impl Read, options: QueryOptions) -> Result<Vec<T>, Error> {
        let mut span = Span::new(ExecKind::Load, T::NAME);
        let mut window = options.window();
        let mut records = Vec::new();
        let mut scanned = 0;

        RecordStore::new(T::NAME).scan::<Error, _>(tx, options.reverse, |_, bytes| {
            scanned += 1;
            Ok(match window.admit() {
                Admit::Skip => Walk::Continue,
                Admit::Take => {
                    records.push(decode(self.db, bytes)?);
                    if window.is_full() { Walk::Stop } else { Walk::Continue }
                }
                Admit::Done => Walk::Stop,
            })
        })?;

        sink::record(MetricsEvent::RowsScanned {
            model: T::NAME,
            rows_scanned: scanned,
        });
        span.set_rows(rows(records.len()));

        Ok(records)
    }

    /// Every record in the order of the index on `field`. The primary key
    /// orders like `all`; an unindexed field or a missing index bucket is
    /// `NotFound`.
    pub fn all_by_index(&self, field: &str, options: QueryOptions) -> Result<Vec<T>, Error> {
        self.db.view(|tx| self.all_by_index_in(tx, field, options))
    }

    pub fn all_by_index_in(
        &self,
        tx: &impl Read,
        field: &str,
        options: QueryOptions,
    ) -> Result<Vec<T>, Error> {
        let info = ModelInfo::of::<T>()?;
        if info.is_primary_key(field) {
            return self.all_in(tx, options);
        }

        let index = IndexStore::for_field(&info, field, self.db.generation())
            .ok_or(Error::NotFound)?;
        self.db.debug_log(format!(
            "all_by_index on {} via {}",
            T::NAME,
            index.bucket()
        ));

        let mut span = Span::new(ExecKind::Load, T::NAME);
        let keys = index.all_records(tx, options)?;
        let records = self.fetch(tx, &keys)?;
        span.set_rows(rows(records.len()));

        Ok(records)
    }

    // ─────────────────────────────────────────────
    // Field matching
    // ─────────────────────────────────────────────

    /// Records whose `field` equals `value`. Indexed fields are resolved
    /// through their index, other fields by a full scan. `NotFound` when
    /// nothing matches.
    pub fn find(
        &self,
        field: &str,
        value: impl FieldValue,
        options: QueryOptions,
    ) -> Result<Vec<T>, Error> {
        self.db
            .view(|tx| self.find_in(tx, field, &value.to_value(), options))
    }

    pub fn find_in(
        &self,
        tx: &impl Read,
        field: &str,
        value: &Value,
        options: QueryOptions,
    ) -> Result<Vec<T>, Error> {
        let info = ModelInfo::of::<T>()?;
        if !info.has_field(field) {
            return Err(Error::UnknownField(field.to_string()));
        }

        let mut span = Span::new(ExecKind::Load, T::NAME);
        let records = if info.is_primary_key(field) {
            let key = encode_key(value, self.db.generation(), self.db.codec())?;
            let bytes = RecordStore::new(T::NAME)
                .get(tx, &key)?
                .ok_or(Error::NotFound)?;

            options.window().apply(vec![decode(self.db, &bytes)?])
        } else if let Some(index) = IndexStore::for_field(&info, field, self.db.generation()) {
            if value.is_zero() {
                return Err(Error::NotFound);
            }
            self.db
                .debug_log(format!("find on {} via {}", T::NAME, index.bucket()));

            let key = encode_key(value, self.db.generation(), self.db.codec())?;
            let lookup = index.lookup(tx, &key, options)?;
            if !lookup.matched {
                return Err(Error::NotFound);
            }

            self.fetch(tx, &lookup.keys)?
        } else {
            self.db
                .debug_log(format!("find on {} scans for {field}", T::NAME));

            self.scan_matching(tx, field, value, options)?
        };
        span.set_rows(rows(records.len()));

        Ok(records)
    }

    /// First record whose `field` equals `value`.
    pub fn one(&self, field: &str, value: impl FieldValue) -> Result<T, Error> {
        self.db.view(|tx| self.one_in(tx, field, &value.to_value()))
    }

    pub fn one_in(&self, tx: &impl Read, field: &str, value: &Value) -> Result<T, Error> {
        self.find_in(tx, field, value, QueryOptions::new().limit(1))?
            .into_iter()
            .next()
            .ok_or(Error::NotFound)
    }

    // ─────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────

    /// Resolve primary keys produced by an index. A dangling entry means the
    /// index and the records disagree.
    fn fetch(&self, tx: &impl Read, keys: &[Vec<u8>]) -> Result<Vec<T>, Error> {
        let store = RecordStore::new(T::NAME);

        keys.iter()
            .map(|key| {
                let bytes = store.get(tx, key)?.ok_or(Error::NotFound)?;
                decode(self.db, &bytes)
            })
            .collect()
    }

    fn scan_matching(
        &self,
        tx: &impl Read,
        field: &str,
        value: &Value,
        options: QueryOptions,
    ) -> Result<Vec<T>, Error> {
        let mut window = options.window();
        let mut records = Vec::new();
        let mut matched = false;
        let mut scanned = 0;

        RecordStore::new(T::NAME).scan::<Error, _>(tx, options.reverse, |_, bytes| {
            scanned += 1;
            let record: T = decode(self.db, bytes)?;
            if record.get_value(field).as_ref() != Some(value) {
                return Ok(Walk::Continue);
            }
            matched = true;

            Ok(match window.admit() {
                Admit::Skip => Walk::Continue,
                Admit::Take => {
                    records.push(record);
                    if window.is_full() { Walk::Stop } else { Walk::Continue }
                }
                Admit::Done => Walk::Stop,
            })
        })?;

        sink::record(MetricsEvent::RowsScanned {
            model: T::NAME,
            rows_scanned: scanned,
        });

        if matched {
            Ok(records)
        } else {
            Err(Error::NotFound)
        }
    }
}
