//! Database handle, storage layers, and executors.

mod bucket;
pub mod engine;
pub mod executor;
pub mod generation;
pub mod index;
mod key;
mod options;
pub mod store;

#[cfg(test)]
mod tests;

use crate::{
    config::Config,
    error::Error,
    serialize::{Codec, Json},
    traits::{FieldValue, Model},
};
use log::{debug, info};
use std::path::Path;

// re-exports
pub use bucket::KvBucket;
pub use engine::{Engine, Read, ReadTx, StoreError, Walk, WriteTx};
pub use executor::{DeleteExecutor, LoadExecutor, SaveExecutor};
pub use generation::Generation;
pub use key::encode_key;
pub use options::QueryOptions;

///
/// Db
///
/// Handle over one database file. Cheap to clone; clones share the engine.
///

#[derive(Clone, Debug)]
pub struct Db<C: Codec = Json> {
    engine: Engine,
    codec: C,
    config: Config,
}

impl Db<Json> {
    /// Open with the default codec and configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with(path, Json, Config::default())
    }
}

impl<C: Codec> Db<C> {
    // ======================================================================
    // Construction
    // ======================================================================

    /// Open or create the file, stamping the configured generation when the
    /// database carries no marker yet.
    pub fn open_with(path: impl AsRef<Path>, codec: C, config: Config) -> Result<Self, Error> {
        let engine = Engine::open(path, config.open_timeout())?;
        let db = Self::attach(engine, codec, config);
        db.check_generation()?;

        Ok(db)
    }

    /// Wrap an already open engine without checking or stamping the marker.
    #[must_use]
    pub const fn attach(engine: Engine, codec: C, config: Config) -> Self {
        Self {
            engine,
            codec,
            config,
        }
    }

    fn check_generation(&self) -> Result<(), Error> {
        let expected = self.generation();

        self.engine.update(|tx| match generation::read_marker(tx)? {
            None => {
                info!(
                    "stamping {} as generation {expected}",
                    self.engine.path().display()
                );
                generation::stamp(tx, expected)
            }
            Some(stored) if stored == expected => Ok(()),
            Some(stored) => Err(Error::GenerationMismatch { stored, expected }),
        })
    }

    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub const fn codec(&self) -> &C {
        &self.codec
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.config.generation
    }

    pub(crate) fn debug_log(&self, s: impl Into<String>) {
        if self.config.debug {
            debug!("{}", s.into());
        }
    }

    // ======================================================================
    // Executors
    // ======================================================================

    #[must_use]
    pub const fn load<T: Model>(&self) -> LoadExecutor<'_, C, T> {
        LoadExecutor::new(self)
    }

    #[must_use]
    pub const fn save<T: Model>(&self) -> SaveExecutor<'_, C, T> {
        SaveExecutor::new(self)
    }

    #[must_use]
    pub const fn delete<T: Model>(&self) -> DeleteExecutor<'_, C, T> {
        DeleteExecutor::new(self)
    }

    /// Raw key/value access to a named bucket.
    #[must_use]
    pub fn bucket(&self, name: impl Into<String>) -> KvBucket<'_, C> {
        KvBucket::new(self, name.into())
    }

    // ======================================================================
    // Shortcuts
    // ======================================================================

    /// Save one record in its own write transaction.
    pub fn insert<T: Model>(&self, record: &mut T) -> Result<(), Error> {
        self.save::<T>().save(record)
    }

    pub fn get<T: Model>(&self, key: impl FieldValue) -> Result<T, Error> {
        self.load::<T>().get(key)
    }

    pub fn all<T: Model>(&self, options: QueryOptions) -> Result<Vec<T>, Error> {
        self.load::<T>().all(options)
    }

    pub fn all_by_index<T: Model>(
        &self,
        field: &str,
        options: QueryOptions,
    ) -> Result<Vec<T>, Error> {
        self.load::<T>().all_by_index(field, options)
    }

    pub fn find<T: Model>(
        &self,
        field: &str,
        value: impl FieldValue,
        options: QueryOptions,
    ) -> Result<Vec<T>, Error> {
        self.load::<T>().find(field, value, options)
    }

    pub fn one<T: Model>(&self, field: &str, value: impl FieldValue) -> Result<T, Error> {
        self.load::<T>().one(field, value)
    }

    pub fn remove<T: Model>(&self, key: impl FieldValue) -> Result<(), Error> {
        self.delete::<T>().delete(key)
    }

    pub fn init<T: Model>(&self) -> Result<(), Error> {
        self.save::<T>().init()
    }

    pub fn reindex<T: Model>(&self) -> Result<(), Error> {
        self.save::<T>().reindex()
    }

    /// Drop the bucket of `T` with its records and indexes.
    pub fn drop_model<T: Model>(&self) -> Result<(), Error> {
        self.delete::<T>().drop()
    }

    /// Drop any bucket by name. `NotFound` when it does not exist.
    pub fn drop_bucket(&self, name: &str) -> Result<(), Error> {
        self.engine.update(|tx| {
            if tx.drop_bucket(name)? {
                Ok(())
            } else {
                Err(Error::NotFound)
            }
        })
    }

    /// Run `f` in a read transaction.
    pub fn view<T>(&self, f: impl FnOnce(&ReadTx) -> Result<T, Error>) -> Result<T, Error> {
        self.engine.view(f)
    }

    /// Run `f` in a write transaction; commit on `Ok`, abort on `Err`.
    pub fn update<T>(&self, f: impl FnOnce(&WriteTx) -> Result<T, Error>) -> Result<T, Error> {
        self.engine.update(f)
    }
}
