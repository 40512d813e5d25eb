//! ## Crate layout
//! - `core`: storage engine, codecs, model traits, executors, and metrics.
//! - `Model` / `Schema` derives: field descriptions and name-based access.
//!
//! The `prelude` module carries the vocabulary needed to declare and store
//! records.

pub use burrowdb_core as core;
pub use burrowdb_core::{config, db, error, model, obs, serialize, traits, value};
pub use burrowdb_derive::{Model, Schema};

/// re-exports
///
/// derive output and downstream crates can rely on these without naming
/// the dependencies themselves
pub mod __reexports {
    pub use serde;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use burrowdb_core::{db::Db, error::Error};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{Model, Schema};
    pub use burrowdb_core::prelude::*;
    pub use serde::{Deserialize, Serialize};
}
