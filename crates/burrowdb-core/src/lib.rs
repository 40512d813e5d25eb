//! Core runtime for BurrowDB: the storage engine, model traits, codecs,
//! executors, and the ergonomics exported via the `prelude`.

extern crate self as burrowdb;

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod serialize;
pub mod traits;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary and the database handle.
///

pub mod prelude {
    pub use crate::{
        config::Config,
        db::{Db, Generation, QueryOptions},
        traits::{FieldValue, FieldValues, Model, Schema},
        value::Value,
    };
}
