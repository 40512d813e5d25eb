//! Adapter over the ordered KV engine.
//!
//! A bucket is one `redb` table with byte keys and byte values. Nested
//! buckets are separate tables whose names extend the parent's with `/`,
//! so dropping a bucket drops every table under its name.


use log::warn;
use redb::{
    AccessGuard, CommitError, Database, DatabaseError, ReadOnlyDatabase, ReadableDatabase,
    ReadableTable, StorageError, TableDefinition, TableError, TableHandle, TransactionError,
};
use std::{
    cell::RefCell,
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use thiserror::Error as ThisError;

type Bytes = &'static [u8];

const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Separator between a bucket and its nested buckets.
pub const BUCKET_SEPARATOR: char = '/';

const fn table(name: &str) -> TableDefinition<'_, Bytes, Bytes> {
    TableDefinition::new(name)
}

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error(transparent)]
    Engine(#[from] redb::Error),

    #[error("timed out after {timeout:?} waiting to open '{path}'")]
    OpenTimeout { path: String, timeout: Duration },
}

macro_rules! impl_store_error_from {
    ( $( $source:ty ),* $(,)? ) => {
        $(
            impl From<$source> for StoreError {
                fn from(err: $source) -> Self {
                    Self::Engine(err.into())
                }
            }
        )*
    };
}

impl_store_error_from!(
    DatabaseError,
    TransactionError,
    TableError,
    StorageError,
    CommitError,
);

///
/// Walk
///
/// Continuation signal returned by scan callbacks.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Walk {
    Continue,
    Stop,
}

///
/// Engine
///

#[derive(Clone)]
pub struct Engine {
    db: Arc<Database>,
    path: PathBuf,
}

impl Engine {
    /// Open the file at `path`, creating it when absent. Retries while
    /// another handle holds the file, up to `timeout`.
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, StoreError> {
        Self::open_with(path.as_ref(), timeout, |path| Database::create(path))
    }

    /// Like [`Engine::open`], but fails when the file does not exist.
    pub fn open_existing(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, StoreError> {
        Self::open_with(path.as_ref(), timeout, |path| Database::open(path))
    }

    /// Check that an existing file opens read-only and serves a read
    /// transaction, without taking a writable handle on it.
    pub fn check_readable(path: impl AsRef<Path>, timeout: Duration) -> Result<(), StoreError> {
        let db = retry_open(path.as_ref(), timeout, |path| ReadOnlyDatabase::open(path))?;
        db.begin_read()?;

        Ok(())
    }

    fn open_with(
        path: &Path,
        timeout: Duration,
        opener: impl Fn(&Path) -> Result<Database, DatabaseError>,
    ) -> Result<Self, StoreError> {
        let db = retry_open(path, timeout, opener)?;

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn begin_read(&self) -> Result<ReadTx, StoreError> {
        Ok(ReadTx {
            inner: self.db.begin_read()?,
        })
    }

    pub fn begin_write(&self) -> Result<WriteTx, StoreError> {
        Ok(WriteTx {
            inner: self.db.begin_write()?,
            tables: RefCell::new(None),
        })
    }

    /// Run `f` in a read transaction.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&ReadTx) -> Result<T, E>,
    {
        let tx = self.begin_read()?;

        f(&tx)
    }

    /// Run `f` in a write transaction; commit on `Ok`, abort on `Err`.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&WriteTx) -> Result<T, E>,
    {
        let tx = self.begin_write()?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort) = tx.abort() {
                    warn!("aborting write transaction on {} failed: {abort}", self.path.display());
                }
                Err(err)
            }
        }
    }
}

/// Retry `opener` while another handle holds the file, up to `timeout`.
fn retry_open<D>(
    path: &Path,
    timeout: Duration,
    opener: impl Fn(&Path) -> Result<D, DatabaseError>,
) -> Result<D, StoreError> {
    let deadline = Instant::now() + timeout;

    loop {
        match opener(path) {
            Ok(db) => return Ok(db),
            Err(DatabaseError::DatabaseAlreadyOpen) if Instant::now() < deadline => {
                thread::sleep(OPEN_RETRY_INTERVAL);
            }
            Err(DatabaseError::DatabaseAlreadyOpen) => {
                return Err(StoreError::OpenTimeout {
                    path: path.display().to_string(),
                    timeout,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("path", &self.path).finish()
    }
}

///
/// Read
///
/// Read access shared by read and write transactions. Absent buckets read
/// as empty.
///

pub trait Read {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Visit entries whose key starts with `prefix`, in key order or reversed.
    /// Returns false when the callback stopped the walk early.
    fn scan<E, F>(&self, bucket: &str, prefix: &[u8], reverse: bool, f: F) -> Result<bool, E>
    where
        E: From<StoreError>,
        F: FnMut(&[u8], &[u8]) -> Result<Walk, E>;

    /// Names of every bucket, nested ones included.
    fn buckets(&self) -> Result<Vec<String>, StoreError>;

    /// Collect every entry of a bucket.
    fn entries(&self, bucket: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut out = Vec::new();
        self.scan::<StoreError, _>(bucket, &[], false, |key, value| {
            out.push((key.to_vec(), value.to_vec()));
            Ok(Walk::Continue)
        })?;

        Ok(out)
    }
}

///
/// ReadTx
///

pub struct ReadTx {
    inner: redb::ReadTransaction,
}

impl Read for ReadTx {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        match self.inner.open_table(table(bucket)) {
            Ok(_) => Ok(true),
            Err(TableError::TableDoesNotExist(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let table = match self.inner.open_table(table(bucket)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
    }

    fn scan<E, F>(&self, bucket: &str, prefix: &[u8], reverse: bool, mut f: F) -> Result<bool, E>
    where
        E: From<StoreError>,
        F: FnMut(&[u8], &[u8]) -> Result<Walk, E>,
    {
        let table = match self.inner.open_table(table(bucket)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(true),
            Err(err) => return Err(StoreError::from(err).into()),
        };

        walk_table(&table, prefix, reverse, &mut f)
    }

    fn buckets(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .list_tables()?
            .map(|handle| handle.name().to_string())
            .collect())
    }
}

///
/// WriteTx
///
/// A write transaction. Scan callbacks must not write: collect first, then
/// mutate.
///
/// Opening a table inside a write transaction creates it, so existence
/// checks go through a cache of table names loaded once per transaction
/// and kept in step with every create and drop.
///

pub struct WriteTx {
    inner: redb::WriteTransaction,
    tables: RefCell<Option<BTreeSet<String>>>,
}

impl WriteTx {
    pub fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.inner.open_table(table(bucket))?;
        self.note_created(bucket)?;

        Ok(())
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut BTreeSet<String>) -> T) -> Result<T, StoreError> {
        let mut cache = self.tables.borrow_mut();
        if let Some(tables) = cache.as_mut() {
            return Ok(f(tables));
        }

        let mut tables = table_names(&self.inner)?;
        let out = f(&mut tables);
        *cache = Some(tables);

        Ok(out)
    }

    fn note_created(&self, bucket: &str) -> Result<(), StoreError> {
        self.with_tables(|tables| {
            if !tables.contains(bucket) {
                tables.insert(bucket.to_string());
            }
        })
    }

    /// Drop a bucket and every bucket nested under it. Returns false when
    /// nothing was dropped.
    pub fn drop_bucket(&self, bucket: &str) -> Result<bool, StoreError> {
        let nested = format!("{bucket}{BUCKET_SEPARATOR}");
        let targets: Vec<String> = self
            .buckets()?
            .into_iter()
            .filter(|name| name == bucket || name.starts_with(&nested))
            .collect();

        for name in &targets {
            self.inner.delete_table(table(name))?;
        }
        self.with_tables(|tables| {
            for name in &targets {
                tables.remove(name);
            }
        })?;

        Ok(!targets.is_empty())
    }

    pub fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut table = self.inner.open_table(table(bucket))?;
        table.insert(key, value)?;
        drop(table);
        self.note_created(bucket)?;

        Ok(())
    }

    /// Remove one key. Returns whether it was present; absent buckets are a
    /// no-op.
    pub fn delete(&self, bucket: &str, key: &[u8]) -> Result<bool, StoreError> {
        if !self.bucket_exists(bucket)? {
            return Ok(false);
        }

        let mut table = self.inner.open_table(table(bucket))?;
        let removed = table.remove(key)?.is_some();

        Ok(removed)
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()?;

        Ok(())
    }

    pub fn abort(self) -> Result<(), StoreError> {
        self.inner.abort()?;

        Ok(())
    }
}

impl Read for WriteTx {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        self.with_tables(|tables| tables.contains(bucket))
    }

    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if !self.bucket_exists(bucket)? {
            return Ok(None);
        }

        let table = self.inner.open_table(table(bucket))?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());

        Ok(value)
    }

    fn scan<E, F>(&self, bucket: &str, prefix: &[u8], reverse: bool, mut f: F) -> Result<bool, E>
    where
        E: From<StoreError>,
        F: FnMut(&[u8], &[u8]) -> Result<Walk, E>,
    {
        if !self.bucket_exists(bucket)? {
            return Ok(true);
        }

        let table = self
            .inner
            .open_table(table(bucket))
            .map_err(StoreError::from)?;

        walk_table(&table, prefix, reverse, &mut f)
    }

    fn buckets(&self) -> Result<Vec<String>, StoreError> {
        self.with_tables(|tables| tables.iter().cloned().collect())
    }
}

fn table_names(tx: &redb::WriteTransaction) -> Result<BTreeSet<String>, StoreError> {
    Ok(tx
        .list_tables()?
        .map(|handle| handle.name().to_string())
        .collect())
}

fn walk_table<T, E, F>(table: &T, prefix: &[u8], reverse: bool, f: &mut F) -> Result<bool, E>
where
    T: ReadableTable<Bytes, Bytes>,
    E: From<StoreError>,
    F: FnMut(&[u8], &[u8]) -> Result<Walk, E>,
{
    let upper = prefix_upper_bound(prefix);
    let range = match upper.as_deref() {
        Some(upper) => table.range(prefix..upper),
        None => table.range(prefix..),
    }
    .map_err(StoreError::from)?;

    if reverse {
        drive(range.rev(), f)
    } else {
        drive(range, f)
    }
}

fn drive<'a, I, E, F>(entries: I, f: &mut F) -> Result<bool, E>
where
    I: Iterator<Item = Result<(AccessGuard<'a, Bytes>, AccessGuard<'a, Bytes>), StorageError>>,
    E: From<StoreError>,
    F: FnMut(&[u8], &[u8]) -> Result<Walk, E>,
{
    for entry in entries {
        let (key, value) = entry.map_err(StoreError::from)?;

        if f(key.value(), value.value())? == Walk::Stop {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Smallest key greater than every key starting with `prefix`; `None` when
/// no such bound exists (empty or all-`0xFF` prefix).
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();

    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }

    None
}
