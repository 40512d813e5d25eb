
use crate::{
    db::{
        engine::{BUCKET_SEPARATOR, Read, StoreError, Walk, WriteTx},
        generation::Generation,
    },
    error::Error,
    serialize::Codec,
};
use serde::{Deserialize, Serialize};

/// Reserved key of the per-bucket configuration entry (0.4 layout).
pub const CONFIG_KEY: &[u8] = b"__burrow_config";

const SEQUENCE_BUCKET: &str = "__burrow_sequence";
const SEQUENCE_KEY: &[u8] = b"next";

///
/// BucketConfig
///
/// Per-bucket configuration entry written by the 0.4 layout.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BucketConfig {
    pub codec: String,
    pub auto_increment: bool,
}

///
/// RecordStore
///
/// Primary key → encoded record bytes for one named bucket, plus its
/// auto-increment sequence.
///

#[derive(Clone, Copy, Debug)]
pub struct RecordStore<'a> {
    name: &'a str,
}

impl<'a> RecordStore<'a> {
    #[must_use]
    pub const fn new(name: &'a str) -> Self {
        Self { name }
    }

    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    fn sequence_bucket(&self) -> String {
        format!("{}{BUCKET_SEPARATOR}{SEQUENCE_BUCKET}", self.name)
    }

    // ======================================================================
    // Bucket lifecycle
    // ======================================================================

    /// Create the bucket if absent; in the 0.4 layout also (re)write the
    /// configuration entry.
    pub fn ensure<C: Codec>(
        &self,
        tx: &WriteTx,
        generation: Generation,
        codec: &C,
        auto_increment: bool,
    ) -> Result<(), Error> {
        tx.create_bucket(self.name)?;

        if generation.keeps_bucket_config() {
            let config = BucketConfig {
                codec: codec.name().to_string(),
                auto_increment,
            };
            tx.put(self.name, CONFIG_KEY, &codec.encode(&config)?)?;
        }

        Ok(())
    }

    pub fn exists(&self, tx: &impl Read) -> Result<bool, StoreError> {
        tx.bucket_exists(self.name)
    }

    pub fn config<C: Codec>(
        &self,
        tx: &impl Read,
        codec: &C,
    ) -> Result<Option<BucketConfig>, Error> {
        match tx.get(self.name, CONFIG_KEY)? {
            Some(bytes) => Ok(Some(codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // ======================================================================
    // Records
    // ======================================================================

    pub fn get(&self, tx: &impl Read, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        tx.get(self.name, key)
    }

    pub fn put(&self, tx: &WriteTx, key: &[u8], bytes: &[u8]) -> Result<(), StoreError> {
        tx.put(self.name, key, bytes)
    }

    pub fn remove(&self, tx: &WriteTx, key: &[u8]) -> Result<bool, StoreError> {
        tx.delete(self.name, key)
    }

    /// Walk records in primary-key order, skipping the configuration entry.
    pub fn scan<E, F>(&self, tx: &impl Read, reverse: bool, mut f: F) -> Result<bool, E>
    where
        E: From<StoreError>,
        F: FnMut(&[u8], &[u8]) -> Result<Walk, E>,
    {
        tx.scan(self.name, &[], reverse, |key, value| {
            if key == CONFIG_KEY {
                return Ok(Walk::Continue);
            }
            f(key, value)
        })
    }

    /// Collect every record entry in primary-key order.
    pub fn entries(&self, tx: &impl Read) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut out = Vec::new();
        self.scan::<StoreError, _>(tx, false, |key, value| {
            out.push((key.to_vec(), value.to_vec()));
            Ok(Walk::Continue)
        })?;

        Ok(out)
    }

    // ======================================================================
    // Sequence
    // ======================================================================

    pub fn current_sequence(&self, tx: &impl Read) -> Result<u64, StoreError> {
        let raw = tx.get(&self.sequence_bucket(), SEQUENCE_KEY)?;

        Ok(raw
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
            .map_or(0, u64::from_be_bytes))
    }

    /// Reserve and return the next sequence value.
    pub fn next_sequence(&self, tx: &WriteTx) -> Result<u64, StoreError> {
        let next = self.current_sequence(tx)?.saturating_add(1);
        tx.put(&self.sequence_bucket(), SEQUENCE_KEY, &next.to_be_bytes())?;

        Ok(next)
    }

    /// Raise the sequence to at least `key` so later assigned keys never
    /// collide with an explicit one.
    pub fn observe_sequence(&self, tx: &WriteTx, key: u64) -> Result<(), StoreError> {
        if key > self.current_sequence(tx)? {
            tx.put(&self.sequence_bucket(), SEQUENCE_KEY, &key.to_be_bytes())?;
        }

        Ok(())
    }
}
