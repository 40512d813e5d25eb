use burrowdb::{
    Error,
    db::{Engine, Generation, KvBucket, Read, StoreError, generation::METADATA_BUCKET},
    prelude::*,
    serialize::{Codec, Json},
};
use burrowdb_migrate::{KeyCandidate, MigrateError, Migrator};
use pretty_assertions::assert_eq;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::TempDir;
use time::OffsetDateTime;

///
/// A
///

#[derive(Clone, Debug, Deserialize, Model, PartialEq, Serialize)]
pub struct A {
    pub id: i64,
    #[burrow(index)]
    pub field1: String,
    #[serde(with = "time::serde::rfc3339")]
    pub field2: OffsetDateTime,
}

///
/// B
///

#[derive(Clone, Debug, Deserialize, Model, PartialEq, Serialize)]
pub struct B {
    pub id: String,
    #[burrow(unique)]
    pub field1: i64,
}

fn a(i: i64) -> A {
    A {
        id: i,
        field1: if i % 2 == 0 { "even" } else { "odd" }.to_string(),
        field2: OffsetDateTime::from_unix_timestamp(1_600_000_000 + i).unwrap(),
    }
}

fn b(i: i64) -> B {
    B {
        id: format!("b-{i:02}"),
        field1: i * 100,
    }
}

fn config(generation: Generation) -> Config {
    Config::default().with_generation(generation)
}

/// Write the end-to-end fixture in the given generation and close it.
fn fixture(dir: &TempDir, generation: Generation) -> PathBuf {
    let path = dir.path().join(format!("src-{generation}.redb"));
    let db = Db::open_with(&path, Json, config(generation)).unwrap();

    for i in 1..=10 {
        db.insert(&mut a(i)).unwrap();
        db.insert(&mut b(i)).unwrap();
    }

    // text keys on even rounds, integer keys on odd ones; each round stores
    // one integer value and one record value
    let bucket = db.bucket("bucket");
    for i in 0..10i64 {
        if i % 2 == 0 {
            bucket.set(format!("string{i}"), &i).unwrap();
            bucket.set(format!("string{}", i + 1), &a(i + 11)).unwrap();
        } else {
            bucket.set(i + 11, &i).unwrap();
            bucket.set(i + 12, &a(i + 12)).unwrap();
        }
    }

    path
}

fn assert_kv<C: Codec>(bucket: &KvBucket<'_, C>) {
    for i in 0..10i64 {
        if i % 2 == 0 {
            assert_eq!(bucket.get::<i64>(format!("string{i}")).unwrap(), i);
            assert_eq!(bucket.get::<A>(format!("string{}", i + 1)).unwrap(), a(i + 11));
        } else {
            assert_eq!(bucket.get::<i64>(i + 11).unwrap(), i);
            assert_eq!(bucket.get::<A>(i + 12).unwrap(), a(i + 12));
        }
    }
}

fn migrator(path: &Path) -> Migrator {
    Migrator::new(path)
        .add_model::<A>()
        .add_model::<B>()
        .add_kv(
            "bucket",
            vec![KeyCandidate::decode::<i64>(), KeyCandidate::Text],
        )
}

#[test]
fn oldest_generation_migrates_to_latest() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V04);
    let dst = dir.path().join("dst.redb");

    let reached = migrator(&src).run(&dst).unwrap();
    assert_eq!(reached, Generation::V06);

    let db = Db::open(&dst).unwrap();
    for i in 1..=10 {
        assert_eq!(db.get::<A>(i).unwrap(), a(i));
        assert_eq!(db.get::<B>(format!("b-{i:02}")).unwrap(), b(i));
    }

    let ids: Vec<_> = db
        .all::<A>(QueryOptions::new())
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());

    let even = db.find::<A>("field1", "even", QueryOptions::new()).unwrap();
    assert_eq!(even.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 4, 6, 8, 10]);
    assert_eq!(db.one::<B>("field1", 300i64).unwrap(), b(3));

    let bucket = db.bucket("bucket");
    assert_eq!(bucket.entries().unwrap().len(), 20);
    assert_kv(&bucket);
}

#[test]
fn the_source_file_is_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V04);
    let before = std::fs::read(&src).unwrap();

    migrator(&src).run(dir.path().join("dst.redb")).unwrap();

    assert_eq!(std::fs::read(&src).unwrap(), before);

    let db = Db::open_with(&src, Json, config(Generation::V04)).unwrap();
    assert_eq!(db.get::<A>(3i64).unwrap(), a(3));
    assert_kv(&db.bucket("bucket"));
}

#[test]
fn migrating_twice_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V04);
    let dst = dir.path().join("dst.redb");
    migrator(&src).run(&dst).unwrap();

    let snapshot = |path: &Path| {
        let engine = Engine::open_existing(path, Duration::from_secs(1)).unwrap();
        let tx = engine.begin_read().unwrap();
        let mut buckets = tx.buckets().unwrap();
        buckets.sort();

        buckets
            .into_iter()
            .map(|name| {
                let entries = tx.entries(&name).unwrap();
                (name, entries)
            })
            .collect::<Vec<_>>()
    };

    let before = snapshot(&dst);
    let reached = migrator(&dst).migrate().unwrap();
    assert_eq!(reached, Generation::V06);
    assert_eq!(snapshot(&dst), before);
}

#[test]
fn middle_generation_is_reindexed_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V05);

    let reached = migrator(&src).migrate().unwrap();
    assert_eq!(reached, Generation::V06);

    let db = Db::open(&src).unwrap();
    let odd = db
        .find::<A>("field1", "odd", QueryOptions::new().reverse())
        .unwrap();
    assert_eq!(odd.iter().map(|a| a.id).collect::<Vec<_>>(), vec![9, 7, 5, 3, 1]);

    let by_index = db.all_by_index::<B>("field1", QueryOptions::new().limit(2)).unwrap();
    assert_eq!(by_index, vec![b(1), b(2)]);
}

#[test]
fn target_stops_at_an_intermediate_generation() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V04);

    let reached = migrator(&src).target(Generation::V05).migrate().unwrap();
    assert_eq!(reached, Generation::V05);

    let db = Db::open_with(&src, Json, config(Generation::V05)).unwrap();
    assert_eq!(db.get::<A>(10i64).unwrap(), a(10));
}

#[test]
fn unknown_markers_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.redb");
    {
        let engine = Engine::open(&path, Duration::from_secs(1)).unwrap();
        engine
            .update::<_, StoreError, _>(|tx| {
                tx.create_bucket(METADATA_BUCKET)?;
                tx.put(METADATA_BUCKET, b"version", b"9.9.0")
            })
            .unwrap();
    }

    let err = migrator(&path).migrate().unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Db(Error::UnknownGeneration(ref marker)) if marker == "9.9.0"
    ));
}

#[test]
fn existing_destinations_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V04);
    let dst = dir.path().join("taken.redb");
    std::fs::write(&dst, b"occupied").unwrap();

    let err = migrator(&src).run(&dst).unwrap_err();
    assert!(matches!(err, MigrateError::DestinationExists(_)));
    assert_eq!(std::fs::read(&dst).unwrap(), b"occupied");
}

#[test]
fn a_held_source_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V04);
    let _held = Engine::open_existing(&src, Duration::from_secs(1)).unwrap();

    let err = migrator(&src)
        .open_timeout(Duration::from_millis(50))
        .run(dir.path().join("dst.redb"))
        .unwrap_err();
    assert!(matches!(err, MigrateError::Store(StoreError::OpenTimeout { .. })));
}

#[test]
fn unreadable_keys_exhaust_the_candidate_chain() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V04);

    let err = Migrator::new(&src)
        .add_model::<A>()
        .add_kv("bucket", vec![KeyCandidate::decode::<i64>()])
        .migrate()
        .unwrap_err();
    assert!(matches!(
        err,
        MigrateError::KeyCandidatesExhausted { ref bucket, ref key }
            if bucket == "bucket" && key == b"string0"
    ));
}

#[test]
fn a_run_stopped_midway_through_rekeying_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let src = fixture(&dir, Generation::V04);

    // integer keys sort before text keys, so this chain rewrites every
    // integer key and then stops at the first text key
    let err = Migrator::new(&src)
        .add_model::<A>()
        .add_kv("bucket", vec![KeyCandidate::decode::<i64>()])
        .migrate()
        .unwrap_err();
    assert!(matches!(err, MigrateError::KeyCandidatesExhausted { .. }));

    let reached = migrator(&src).migrate().unwrap();
    assert_eq!(reached, Generation::V06);

    let db = Db::open(&src).unwrap();
    assert_eq!(db.bucket("bucket").entries().unwrap().len(), 20);
    assert_kv(&db.bucket("bucket"));
    assert_eq!(db.get::<A>(4i64).unwrap(), a(4));
    assert_eq!(db.one::<B>("field1", 700i64).unwrap(), b(7));
}
