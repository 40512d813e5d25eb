//! Forward-only migration of BurrowDB files across storage generations.
//!
//! A [`Migrator`] knows the record types and key/value buckets stored in a
//! file. It reads the generation marker and applies one transition at a time
//! until the target generation is stamped:
//!
//! - `0.4 → 0.5` rebuilds every model bucket under the new key encoding and
//!   re-keys every registered key/value bucket.
//! - `0.5 → 0.6` rebuilds every index in the terminated list layout.

mod candidate;
mod error;
mod migrator;

#[cfg(test)]
mod tests;

pub use candidate::KeyCandidate;
pub use error::MigrateError;
pub use migrator::Migrator;
