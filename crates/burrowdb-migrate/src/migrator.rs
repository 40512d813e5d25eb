use crate::{candidate::KeyCandidate, error::MigrateError};
use burrowdb::{
    config::{Config, DEFAULT_OPEN_TIMEOUT_MS},
    db::{
        Db, Engine, Generation, QueryOptions, Read, StoreError, encode_key,
        engine::BUCKET_SEPARATOR,
        generation::{self, LEGACY_METADATA_BUCKET},
        store::RecordStore,
    },
    error::Error,
    serialize::{Codec, Json},
    traits::Model,
};
use log::{debug, info};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

type RebuildFn<C> = fn(&Engine, &C) -> Result<usize, Error>;
type ReindexFn<C> = fn(&Engine, &C) -> Result<(), Error>;

/// Keys already rewritten for a bucket, nested under the 0.4 metadata bucket
/// so the 0.4 → 0.5 stamp drops them together.
fn rekeyed_bucket(bucket: &str) -> String {
    format!("{LEGACY_METADATA_BUCKET}{BUCKET_SEPARATOR}rekeyed{BUCKET_SEPARATOR}{bucket}")
}

///
/// ModelPlan
///
/// Type-erased transitions for one registered model.
///

struct ModelPlan<C: Codec> {
    name: &'static str,
    rebuild: RebuildFn<C>,
    reindex: ReindexFn<C>,
}

///
/// Migrator
///
/// Registry of the models and key/value buckets stored in one file, and the
/// state machine that moves the file to a target generation.
///

pub struct Migrator<C: Codec = Json> {
    path: PathBuf,
    codec: C,
    models: Vec<ModelPlan<C>>,
    buckets: BTreeMap<String, Vec<KeyCandidate<C>>>,
    target: Generation,
    open_timeout: Duration,
}

impl Migrator<Json> {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_codec(path, Json)
    }
}

impl<C: Codec> Migrator<C> {
    #[must_use]
    pub fn with_codec(path: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            path: path.into(),
            codec,
            models: Vec::new(),
            buckets: BTreeMap::new(),
            target: Generation::LATEST,
            open_timeout: Duration::from_millis(DEFAULT_OPEN_TIMEOUT_MS),
        }
    }

    // ======================================================================
    // Registry
    // ======================================================================

    /// Register a record type stored in the file.
    #[must_use]
    pub fn add_model<T: Model>(mut self) -> Self {
        self.models.push(ModelPlan {
            name: T::NAME,
            rebuild: rebuild::<C, T>,
            reindex: reindex::<C, T>,
        });
        self
    }

    /// Register a key/value bucket with the ordered chain used to read its
    /// 0.4 keys.
    #[must_use]
    pub fn add_kv(mut self, bucket: impl Into<String>, candidates: Vec<KeyCandidate<C>>) -> Self {
        self.buckets.insert(bucket.into(), candidates);
        self
    }

    #[must_use]
    pub const fn target(mut self, target: Generation) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub const fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    // ======================================================================
    // Entry points
    // ======================================================================

    /// Copy the source file to `dst` and migrate the copy. The source is
    /// never modified.
    pub fn run(&self, dst: impl AsRef<Path>) -> Result<Generation, MigrateError> {
        let dst = dst.as_ref();
        if dst.exists() {
            return Err(MigrateError::DestinationExists(dst.display().to_string()));
        }

        // read-only, and fails fast while another handle holds the source
        Engine::check_readable(&self.path, self.open_timeout)?;
        copy_file(&self.path, dst)?;
        info!("copied {} to {}", self.path.display(), dst.display());

        self.migrate_file(dst)
    }

    /// Migrate the source file in place.
    pub fn migrate(&self) -> Result<Generation, MigrateError> {
        self.migrate_file(&self.path)
    }

    pub fn migrate_file(&self, path: impl AsRef<Path>) -> Result<Generation, MigrateError> {
        let engine = Engine::open_existing(path, self.open_timeout)?;

        self.migrate_engine(&engine)
    }

    /// Apply transitions until the marker reaches the target. Returns the
    /// generation the file ends at.
    pub fn migrate_engine(&self, engine: &Engine) -> Result<Generation, MigrateError> {
        loop {
            let current = stored_generation(engine)?;
            if current >= self.target {
                return Ok(current);
            }
            let Some(next) = current.next() else {
                return Ok(current);
            };

            info!(
                "migrating {} from {current} to {next}",
                engine.path().display()
            );
            match next {
                Generation::V05 => self.rebuild_all(engine)?,
                Generation::V06 => self.reindex_all(engine)?,
                Generation::V04 => return Err(MigrateError::Stalled(current)),
            }

            if stored_generation(engine)? <= current {
                return Err(MigrateError::Stalled(current));
            }
        }
    }

    // ======================================================================
    // Transitions
    // ======================================================================

    fn rebuild_all(&self, engine: &Engine) -> Result<(), MigrateError> {
        for plan in &self.models {
            let count = (plan.rebuild)(engine, &self.codec)?;
            info!("rebuilt {count} {} records", plan.name);
        }

        for (bucket, candidates) in &self.buckets {
            let count = self.rekey(engine, bucket, candidates)?;
            info!("re-keyed {count} entries in {bucket}");
        }

        engine.update::<_, Error, _>(|tx| {
            tx.drop_bucket(LEGACY_METADATA_BUCKET)?;
            generation::stamp(tx, Generation::V05)
        })?;

        Ok(())
    }

    fn reindex_all(&self, engine: &Engine) -> Result<(), MigrateError> {
        for plan in &self.models {
            (plan.reindex)(engine, &self.codec)?;
            info!("reindexed {}", plan.name);
        }

        engine.update::<_, Error, _>(|tx| generation::stamp(tx, Generation::V06))?;

        Ok(())
    }

    /// Rewrite every key of `bucket` under the 0.5 encoding. Each rewrite
    /// commits on its own together with a progress entry, so a run that
    /// stops midway resumes without feeding rewritten keys to the chain.
    fn rekey(
        &self,
        engine: &Engine,
        bucket: &str,
        candidates: &[KeyCandidate<C>],
    ) -> Result<usize, MigrateError> {
        let progress = rekeyed_bucket(bucket);
        let (entries, done) = engine.view::<_, StoreError, _>(|tx| {
            let done: BTreeSet<Vec<u8>> = tx
                .entries(&progress)?
                .into_iter()
                .map(|(key, _)| key)
                .collect();

            Ok((tx.entries(bucket)?, done))
        })?;
        let mut rewritten = 0;

        for (key, value) in entries {
            if done.contains(&key) {
                debug!("key {key:?} in {bucket} was re-keyed by an earlier run");
                continue;
            }

            let logical = candidates
                .iter()
                .find_map(|candidate| candidate.accept(&self.codec, &key))
                .ok_or_else(|| MigrateError::KeyCandidatesExhausted {
                    bucket: bucket.to_string(),
                    key: key.clone(),
                })?;

            let new_key = encode_key(&logical, Generation::V05, &self.codec).map_err(Error::from)?;
            if new_key == key {
                debug!("key {logical:?} in {bucket} is unchanged");
                continue;
            }

            engine.update::<_, StoreError, _>(|tx| {
                tx.delete(bucket, &key)?;
                tx.put(bucket, &new_key, &value)?;
                tx.put(&progress, &new_key, &[])
            })?;
            rewritten += 1;
        }

        Ok(rewritten)
    }
}

fn stored_generation(engine: &Engine) -> Result<Generation, Error> {
    Ok(engine
        .view(|tx| generation::read_marker(tx))?
        .unwrap_or(Generation::OLDEST))
}

/// Re-save every record of `T` from the 0.4 layout into the 0.5 layout in
/// one write transaction.
fn rebuild<C: Codec, T: Model>(engine: &Engine, codec: &C) -> Result<usize, Error> {
    let store = RecordStore::new(T::NAME);
    let old = Db::attach(
        engine.clone(),
        codec.clone(),
        Config::default().with_generation(Generation::V04),
    );

    engine.update(|tx| {
        if !store.exists(tx)? {
            return Ok(0);
        }

        let auto_increment = store
            .config(tx, codec)?
            .is_some_and(|config| config.auto_increment);
        let records = old.load::<T>().all_in(tx, QueryOptions::new())?;
        tx.drop_bucket(T::NAME)?;

        let new = Db::attach(
            engine.clone(),
            codec.clone(),
            Config::default()
                .with_generation(Generation::V05)
                .with_auto_increment(auto_increment),
        );
        let save = new.save::<T>();
        save.init_in(tx)?;

        let count = records.len();
        for mut record in records {
            save.save_in(tx, &mut record)?;
        }

        Ok(count)
    })
}

fn reindex<C: Codec, T: Model>(engine: &Engine, codec: &C) -> Result<(), Error> {
    Db::attach(
        engine.clone(),
        codec.clone(),
        Config::default().with_generation(Generation::V06),
    )
    .reindex::<T>()
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), MigrateError> {
    let mut input = File::open(src).map_err(|e| MigrateError::io(src, e))?;
    let mut output = File::create_new(dst).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => MigrateError::DestinationExists(dst.display().to_string()),
        _ => MigrateError::io(dst, e),
    })?;

    io::copy(&mut input, &mut output).map_err(|e| MigrateError::io(dst, e))?;
    output.sync_all().map_err(|e| MigrateError::io(dst, e))?;

    Ok(())
}
