//! Secondary indexes.
//!
//! Each index is a bucket nested under its model's bucket. Unique indexes
//! map `value → pk`. List indexes key entries by `(value, pk)` so equal
//! values order by primary key; the table value is always the primary key.


use crate::{
    db::{
        engine::{Read, StoreError, Walk, WriteTx},
        generation::{Generation, ListLayout},
        options::{Admit, QueryOptions},
    },
    error::Error,
    model::{IndexKind, ModelInfo},
    obs::sink::{self, MetricsEvent},
    value::ordered::push_terminated_bytes,
};

const SEPARATOR: &[u8] = b"__";

///
/// IndexStore
///

#[derive(Clone, Debug)]
pub struct IndexStore {
    model: &'static str,
    field: &'static str,
    bucket: String,
    kind: IndexKind,
    layout: ListLayout,
}

///
/// Lookup
///
/// Primary keys matching one value after windowing, and whether anything
/// matched before the window was applied.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Lookup {
    pub keys: Vec<Vec<u8>>,
    pub matched: bool,
}

impl IndexStore {
    #[must_use]
    pub fn new(
        model: &'static str,
        field: &'static str,
        bucket: String,
        kind: IndexKind,
        generation: Generation,
    ) -> Self {
        Self {
            model,
            field,
            bucket,
            kind,
            layout: generation.list_layout(),
        }
    }

    /// Index store for `field`, if the model registers one.
    #[must_use]
    pub fn for_field(info: &ModelInfo, field: &str, generation: Generation) -> Option<Self> {
        let (&field, &kind) = info.indexes.get_key_value(field)?;

        Some(Self::new(
            info.name,
            field,
            info.index_bucket(field),
            kind,
            generation,
        ))
    }

    /// Every index store of a model, in field order.
    #[must_use]
    pub fn all_for(info: &ModelInfo, generation: Generation) -> Vec<Self> {
        info.indexes
            .iter()
            .map(|(&field, &kind)| {
                Self::new(info.name, field, info.index_bucket(field), kind, generation)
            })
            .collect()
    }

    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.field
    }

    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        self.kind
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    // ======================================================================
    // Layout
    // ======================================================================

    /// Stored key of the entry for `(value, pk)`.
    #[must_use]
    pub fn compose(&self, value: &[u8], pk: &[u8]) -> Vec<u8> {
        let mut key = self.prefix(value);
        if self.kind == IndexKind::List {
            key.extend_from_slice(pk);
        }

        key
    }

    fn prefix(&self, value: &[u8]) -> Vec<u8> {
        match (self.kind, self.layout) {
            (IndexKind::Unique, _) => value.to_vec(),
            (IndexKind::List, ListLayout::Separated) => [value, SEPARATOR].concat(),
            (IndexKind::List, ListLayout::Terminated) => {
                let mut out = Vec::with_capacity(value.len() + 2);
                push_terminated_bytes(&mut out, value);
                out
            }
        }
    }

    // ======================================================================
    // Mutation
    // ======================================================================

    pub fn create(&self, tx: &WriteTx) -> Result<(), StoreError> {
        tx.create_bucket(&self.bucket)
    }

    /// Fail with `AlreadyExists` if inserting `(value, pk)` would give a
    /// unique value a second owner.
    pub fn check_unique(&self, tx: &impl Read, value: &[u8], pk: &[u8]) -> Result<(), Error> {
        if self.kind != IndexKind::Unique {
            return Ok(());
        }

        match tx.get(&self.bucket, value)? {
            Some(owner) if owner != pk => {
                sink::record(MetricsEvent::UniqueViolation { model: self.model });
                Err(Error::already_exists(self.model, self.field))
            }
            _ => Ok(()),
        }
    }

    pub fn insert(&self, tx: &WriteTx, value: &[u8], pk: &[u8]) -> Result<(), Error> {
        self.check_unique(tx, value, pk)?;
        tx.put(&self.bucket, &self.compose(value, pk), pk)?;

        Ok(())
    }

    /// Remove the entry for `(value, pk)`; absent entries are a no-op and a
    /// unique entry owned by another record is left alone.
    pub fn remove(&self, tx: &WriteTx, value: &[u8], pk: &[u8]) -> Result<bool, StoreError> {
        let key = self.compose(value, pk);

        if self.kind == IndexKind::Unique && tx.get(&self.bucket, &key)?.as_deref() != Some(pk) {
            return Ok(false);
        }

        tx.delete(&self.bucket, &key)
    }

    // ======================================================================
    // Queries
    // ======================================================================

    /// Primary keys of the whole index in index order. `NotFound` when the
    /// index bucket was never created.
    pub fn all_records(&self, tx: &impl Read, options: QueryOptions) -> Result<Vec<Vec<u8>>, Error> {
        if !tx.bucket_exists(&self.bucket)? {
            return Err(Error::NotFound);
        }

        let mut window = options.window();
        let mut keys = Vec::new();

        tx.scan::<Error, _>(&self.bucket, &[], options.reverse, |_, pk| {
            Ok(match window.admit() {
                Admit::Skip => Walk::Continue,
                Admit::Take => {
                    keys.push(pk.to_vec());
                    if window.is_full() { Walk::Stop } else { Walk::Continue }
                }
                Admit::Done => Walk::Stop,
            })
        })?;

        Ok(keys)
    }

    /// Primary keys whose indexed value equals `value`.
    pub fn lookup(&self, tx: &impl Read, value: &[u8], options: QueryOptions) -> Result<Lookup, Error> {
        if self.kind == IndexKind::Unique {
            let keys: Vec<Vec<u8>> = tx.get(&self.bucket, value)?.into_iter().collect();

            return Ok(Lookup {
                matched: !keys.is_empty(),
                keys: options.window().apply(keys),
            });
        }

        let prefix = self.prefix(value);
        let mut window = options.window();
        let mut lookup = Lookup::default();

        tx.scan::<Error, _>(&self.bucket, &prefix, options.reverse, |key, pk| {
            // a separated prefix can also match a longer value
            if key != self.compose(value, pk).as_slice() {
                return Ok(Walk::Continue);
            }
            lookup.matched = true;

            Ok(match window.admit() {
                Admit::Skip => Walk::Continue,
                Admit::Take => {
                    lookup.keys.push(pk.to_vec());
                    if window.is_full() { Walk::Stop } else { Walk::Continue }
                }
                Admit::Done => Walk::Stop,
            })
        })?;

        Ok(lookup)
    }
}
