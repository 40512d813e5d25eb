use crate::{
    config::Config,
    db::{Db, QueryOptions},
    error::Error,
    model::FieldSpec,
    obs::{metrics_report, metrics_reset_all},
    serialize::Json,
    traits::{FieldValue, FieldValues, Model, Schema},
    value::Value,
};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

///
/// User
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
struct User {
    id: u64,
    email: String,
    group: String,
    age: i64,
}

impl User {
    fn new(id: u64, email: &str, group: &str, age: i64) -> Self {
        Self {
            id,
            email: email.to_string(),
            group: group.to_string(),
            age,
        }
    }
}

impl Schema for User {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("id", None),
        FieldSpec::new("email", Some("unique")),
        FieldSpec::new("group", Some("index")),
        FieldSpec::new("age", None),
    ];
}

impl FieldValues for User {
    fn get_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.to_value()),
            "email" => Some(self.email.to_value()),
            "group" => Some(self.group.to_value()),
            "age" => Some(self.age.to_value()),
            _ => None,
        }
    }

    fn set_value(&mut self, field: &str, value: &Value) -> bool {
        match field {
            "id" => FieldValue::from_value(value).map(|v| self.id = v).is_some(),
            "email" => FieldValue::from_value(value).map(|v| self.email = v).is_some(),
            "group" => FieldValue::from_value(value).map(|v| self.group = v).is_some(),
            "age" => FieldValue::from_value(value).map(|v| self.age = v).is_some(),
            _ => false,
        }
    }
}

impl Model for User {
    const NAME: &'static str = "User";
}

fn db(config: Config) -> (TempDir, Db) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open_with(dir.path().join("exec.redb"), Json, config).unwrap();

    (dir, db)
}

fn seeded() -> (TempDir, Db) {
    let (dir, db) = db(Config::default());
    for (id, email, group, age) in [
        (1, "a@x", "staff", 30),
        (2, "b@x", "admin", 41),
        (3, "c@x", "staff", 30),
        (4, "d@x", "staff", 52),
    ] {
        db.insert(&mut User::new(id, email, group, age)).unwrap();
    }

    (dir, db)
}

fn ids(users: &[User]) -> Vec<u64> {
    users.iter().map(|u| u.id).collect()
}

// ─────────────────────────────────────────────
// Save
// ─────────────────────────────────────────────

#[test]
fn save_then_get_round_trips() {
    let (_dir, db) = seeded();

    let user: User = db.get(2u64).unwrap();
    assert_eq!(user, User::new(2, "b@x", "admin", 41));
}

#[test]
fn zero_key_without_auto_increment_is_rejected() {
    let (_dir, db) = db(Config::default());

    let err = db.insert(&mut User::new(0, "a@x", "staff", 1)).unwrap_err();
    assert!(matches!(err, Error::MissingPrimaryKey("User")));
}

#[test]
fn auto_increment_assigns_keys_after_explicit_ones() {
    let (_dir, db) = db(Config::default().with_auto_increment(true));

    let mut first = User::new(0, "a@x", "staff", 1);
    db.insert(&mut first).unwrap();
    assert_eq!(first.id, 1);

    db.insert(&mut User::new(10, "b@x", "staff", 1)).unwrap();

    let mut next = User::new(0, "c@x", "staff", 1);
    db.insert(&mut next).unwrap();
    assert_eq!(next.id, 11);
}

#[test]
fn duplicate_unique_value_fails_without_side_effects() {
    let (_dir, db) = seeded();

    let err = db.insert(&mut User::new(9, "a@x", "guest", 1)).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(ref what) if what == "User.email"));

    assert!(db.get::<User>(9u64).unwrap_err().is_not_found());
    let err = db
        .find::<User>("group", "guest", QueryOptions::new())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn resave_moves_index_entries() {
    let (_dir, db) = seeded();

    db.insert(&mut User::new(1, "z@x", "admin", 30)).unwrap();

    let user: User = db.one("email", "z@x").unwrap();
    assert_eq!(user.id, 1);
    assert!(db.one::<User>("email", "a@x").unwrap_err().is_not_found());

    let admins = db.find::<User>("group", "admin", QueryOptions::new()).unwrap();
    assert_eq!(ids(&admins), vec![1, 2]);

    // the old unique value is free again
    db.insert(&mut User::new(7, "a@x", "staff", 1)).unwrap();
}

#[test]
fn save_many_is_all_or_nothing() {
    let (_dir, db) = seeded();

    let mut batch = vec![
        User::new(5, "e@x", "staff", 1),
        User::new(6, "a@x", "staff", 1),
    ];
    let err = db.save::<User>().save_many(&mut batch).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));

    assert!(db.get::<User>(5u64).unwrap_err().is_not_found());
}

// ─────────────────────────────────────────────
// Load
// ─────────────────────────────────────────────

#[test]
fn all_on_a_missing_bucket_is_empty() {
    let (_dir, db) = db(Config::default());

    assert!(db.all::<User>(QueryOptions::new()).unwrap().is_empty());
}

#[test]
fn all_honors_skip_limit_and_reverse() {
    let (_dir, db) = seeded();

    let users = db.all::<User>(QueryOptions::new()).unwrap();
    assert_eq!(ids(&users), vec![1, 2, 3, 4]);

    let users = db
        .all::<User>(QueryOptions::new().skip(1).limit(2))
        .unwrap();
    assert_eq!(ids(&users), vec![2, 3]);

    let users = db
        .all::<User>(QueryOptions::new().reverse().limit(3))
        .unwrap();
    assert_eq!(ids(&users), vec![4, 3, 2]);
}

#[test]
fn all_by_index_orders_by_value_then_key() {
    let (_dir, db) = seeded();

    let users = db.all_by_index::<User>("group", QueryOptions::new()).unwrap();
    assert_eq!(ids(&users), vec![2, 1, 3, 4]);

    let users = db
        .all_by_index::<User>("group", QueryOptions::new().reverse().limit(2))
        .unwrap();
    assert_eq!(ids(&users), vec![4, 3]);

    let users = db.all_by_index::<User>("id", QueryOptions::new()).unwrap();
    assert_eq!(ids(&users), vec![1, 2, 3, 4]);
}

#[test]
fn all_by_index_on_an_unindexed_field_is_not_found() {
    let (_dir, db) = seeded();

    let err = db.all_by_index::<User>("age", QueryOptions::new()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn find_uses_indexes_and_scans() {
    let (_dir, db) = seeded();

    let staff = db.find::<User>("group", "staff", QueryOptions::new()).unwrap();
    assert_eq!(ids(&staff), vec![1, 3, 4]);

    let thirty = db.find::<User>("age", 30i64, QueryOptions::new()).unwrap();
    assert_eq!(ids(&thirty), vec![1, 3]);

    let by_key = db.find::<User>("id", 4u64, QueryOptions::new()).unwrap();
    assert_eq!(ids(&by_key), vec![4]);
}

#[test]
fn find_windows_past_the_end_are_empty() {
    let (_dir, db) = seeded();

    let users = db
        .find::<User>("group", "staff", QueryOptions::new().skip(5))
        .unwrap();
    assert!(users.is_empty());
}

#[test]
fn find_on_an_unknown_field_names_it() {
    let (_dir, db) = seeded();

    let err = db.find::<User>("nickname", "x", QueryOptions::new()).unwrap_err();
    assert_eq!(err.to_string(), "field nickname not found");
}

#[test]
fn find_with_no_match_is_not_found() {
    let (_dir, db) = seeded();

    for (field, value) in [("group", Value::from("nobody")), ("age", Value::Int(99))] {
        let err = db
            .load::<User>()
            .find(field, value, QueryOptions::new())
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

#[test]
fn one_returns_the_first_match() {
    let (_dir, db) = seeded();

    let user: User = db.one("group", "staff").unwrap();
    assert_eq!(user.id, 1);
}

// ─────────────────────────────────────────────
// Delete and maintenance
// ─────────────────────────────────────────────

#[test]
fn delete_removes_record_and_index_entries() {
    let (_dir, db) = seeded();

    db.remove::<User>(1u64).unwrap();

    assert!(db.get::<User>(1u64).unwrap_err().is_not_found());
    assert!(db.one::<User>("email", "a@x").unwrap_err().is_not_found());
    let staff = db.find::<User>("group", "staff", QueryOptions::new()).unwrap();
    assert_eq!(ids(&staff), vec![3, 4]);

    assert!(db.remove::<User>(1u64).unwrap_err().is_not_found());
}

#[test]
fn drop_removes_the_whole_model() {
    let (_dir, db) = seeded();

    db.drop_model::<User>().unwrap();

    assert!(db.all::<User>(QueryOptions::new()).unwrap().is_empty());
    assert!(db.drop_model::<User>().unwrap_err().is_not_found());
    assert!(db.drop_bucket("User").unwrap_err().is_not_found());
}

#[test]
fn reindex_rebuilds_dropped_indexes() {
    let (_dir, db) = seeded();

    db.drop_bucket("User/__burrow_index_group").unwrap();
    assert!(
        db.all_by_index::<User>("group", QueryOptions::new())
            .unwrap_err()
            .is_not_found()
    );

    db.reindex::<User>().unwrap();

    let users = db.all_by_index::<User>("group", QueryOptions::new()).unwrap();
    assert_eq!(ids(&users), vec![2, 1, 3, 4]);
}

#[test]
fn reindex_without_a_bucket_is_a_no_op() {
    let (_dir, db) = db(Config::default());

    db.reindex::<User>().unwrap();
    assert!(db.all::<User>(QueryOptions::new()).unwrap().is_empty());
}

#[test]
fn init_creates_empty_index_buckets() {
    let (_dir, db) = db(Config::default());

    db.init::<User>().unwrap();

    let users = db.all_by_index::<User>("group", QueryOptions::new()).unwrap();
    assert!(users.is_empty());
}

#[test]
fn executors_record_metrics() {
    metrics_reset_all();
    let (_dir, db) = seeded();

    db.find::<User>("age", 30i64, QueryOptions::new()).unwrap();

    let counters = metrics_report().counters.unwrap();
    assert_eq!(counters.ops.save_calls, 4);
    assert_eq!(counters.ops.load_calls, 1);
    assert_eq!(counters.ops.rows_scanned, 4);
    assert_eq!(counters.ops.index_inserts, 8);
}
