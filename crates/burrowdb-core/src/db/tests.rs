use super::*;
use crate::{
    db::generation::{LEGACY_METADATA_BUCKET, METADATA_BUCKET, VERSION_KEY},
    serialize::Cbor,
};
use std::time::Duration;
use tempfile::TempDir;

fn path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("db.redb")
}

#[test]
fn open_stamps_a_fresh_file_with_the_configured_generation() {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(path(&dir)).unwrap();

    let marker = db
        .view(|tx| Ok(tx.get(METADATA_BUCKET, VERSION_KEY)?))
        .unwrap();
    assert_eq!(marker.as_deref(), Some(&b"0.6.0"[..]));
    assert_eq!(db.generation(), Generation::V06);
}

#[test]
fn oldest_generation_stamps_the_legacy_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_generation(Generation::V04);
    let db = Db::open_with(path(&dir), Json, config).unwrap();

    let found = db.view(|tx| generation::read_marker(tx)).unwrap();
    assert_eq!(found, Some(Generation::V04));
    assert!(db.view(|tx| Ok(tx.bucket_exists(LEGACY_METADATA_BUCKET)?)).unwrap());
}

#[test]
fn reopening_with_another_generation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    drop(Db::open(path(&dir)).unwrap());

    let config = Config::default().with_generation(Generation::V05);
    let err = Db::open_with(path(&dir), Json, config).unwrap_err();

    assert!(matches!(
        err,
        Error::GenerationMismatch {
            stored: Generation::V06,
            expected: Generation::V05
        }
    ));
}

#[test]
fn attach_skips_the_marker() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::open(path(&dir), Duration::from_secs(1)).unwrap();
    let db = Db::attach(engine, Cbor, Config::default());

    assert_eq!(db.view(|tx| generation::read_marker(tx)).unwrap(), None);
    assert_eq!(db.codec().name(), "cbor");
}

#[test]
fn kv_bucket_stores_codec_values_under_encoded_keys() {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(path(&dir)).unwrap();
    let bucket = db.bucket("settings");

    bucket.set("theme", "dark").unwrap();
    bucket.set(7u64, &vec![1, 2, 3]).unwrap();

    assert_eq!(bucket.get::<String>("theme").unwrap(), "dark");
    assert_eq!(bucket.get::<Vec<i32>>(7u64).unwrap(), vec![1, 2, 3]);

    let entries = bucket.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|(key, value)| key == b"theme" && value == b"\"dark\""));

    bucket.delete("theme").unwrap();
    assert!(bucket.get::<String>("theme").unwrap_err().is_not_found());
    assert!(bucket.delete("theme").unwrap_err().is_not_found());
}

#[test]
fn kv_bucket_reads_from_a_missing_bucket_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(path(&dir)).unwrap();

    let err = db.bucket("nowhere").get::<String>("k").unwrap_err();
    assert!(err.is_not_found());
    assert!(db.bucket("nowhere").entries().unwrap().is_empty());
}
