use crate::{db::engine::StoreError, serialize::SerializeError};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// Error
///
/// Every data-layer failure surfaced by `Db` and its executors.
/// Errors propagate unchanged; the only normalization is `all` on an
/// absent bucket, which yields an empty result instead of `NotFound`.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("model '{0}' has an empty primary key and auto-increment does not apply")]
    MissingPrimaryKey(&'static str),

    #[error("model '{0}' has no primary key field")]
    NoPrimaryKeyField(&'static str),

    #[error("unknown annotation '{annotation}' on field '{model}.{field}'")]
    UnknownAnnotation {
        model: &'static str,
        field: &'static str,
        annotation: &'static str,
    },

    #[error("field {0} not found")]
    UnknownField(String),

    #[error("field '{model}.{field}' is annotated inline but is not a struct")]
    NotAStruct {
        model: &'static str,
        field: &'static str,
    },

    #[error("unknown generation marker '{0}'")]
    UnknownGeneration(String),

    #[error("database is stamped with generation {stored}, expected {expected}")]
    GenerationMismatch {
        stored: crate::db::Generation,
        expected: crate::db::Generation,
    },

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Coarse classification used by callers that branch on failure kind.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound => ErrorClass::NotFound,
            Self::AlreadyExists(_) => ErrorClass::Conflict,
            Self::MissingPrimaryKey(_) | Self::UnknownField(_) => ErrorClass::Invalid,
            Self::NoPrimaryKeyField(_)
            | Self::UnknownAnnotation { .. }
            | Self::NotAStruct { .. } => ErrorClass::Unsupported,
            Self::UnknownGeneration(_) | Self::GenerationMismatch { .. } => {
                ErrorClass::Corruption
            }
            Self::Serialize(err) => err.class(),
            Self::Store(_) => ErrorClass::Internal,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub(crate) fn already_exists(model: &str, field: &str) -> Self {
        Self::AlreadyExists(format!("{model}.{field}"))
    }
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorClass {
    #[display("not_found")]
    NotFound,
    #[display("conflict")]
    Conflict,
    #[display("invalid")]
    Invalid,
    #[display("corruption")]
    Corruption,
    #[display("unsupported")]
    Unsupported,
    #[display("internal")]
    Internal,
}

///
/// TESTS
///
