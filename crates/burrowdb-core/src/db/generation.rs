use crate::{
    db::engine::{Read, WriteTx},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata bucket from 0.5 onward.
pub const METADATA_BUCKET: &str = "__burrow_db";

/// Metadata bucket of the 0.4 layout, dropped by the 0.4 → 0.5 transition.
pub const LEGACY_METADATA_BUCKET: &str = "__burrow_meta";

/// Key of the generation marker inside the metadata bucket.
pub const VERSION_KEY: &[u8] = b"version";

///
/// Generation
///
/// Storage layout generation stamped in the metadata bucket. Ordered from
/// oldest to newest; migrations only move forward.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Generation {
    V04,
    V05,
    V06,
}

impl Generation {
    pub const ALL: [Self; 3] = [Self::V04, Self::V05, Self::V06];
    pub const OLDEST: Self = Self::V04;
    pub const LATEST: Self = Self::V06;

    /// Marker string written to the metadata bucket.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::V04 => "0.4.0",
            Self::V05 => "0.5.0",
            Self::V06 => "0.6.0",
        }
    }

    /// Parse a stored marker. Only major.minor is significant; an empty
    /// marker is the oldest generation.
    pub fn from_marker(marker: &str) -> Result<Self, Error> {
        if marker.is_empty() {
            return Ok(Self::OLDEST);
        }

        let mut parts = marker.split('.');
        match (parts.next(), parts.next()) {
            (Some("0"), Some("4")) => Ok(Self::V04),
            (Some("0"), Some("5")) => Ok(Self::V05),
            (Some("0"), Some("6")) => Ok(Self::V06),
            _ => Err(Error::UnknownGeneration(marker.to_string())),
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::V04 => Some(Self::V05),
            Self::V05 => Some(Self::V06),
            Self::V06 => None,
        }
    }

    #[must_use]
    pub const fn metadata_bucket(self) -> &'static str {
        match self {
            Self::V04 => LEGACY_METADATA_BUCKET,
            Self::V05 | Self::V06 => METADATA_BUCKET,
        }
    }

    #[must_use]
    pub const fn key_encoding(self) -> KeyEncoding {
        match self {
            Self::V04 => KeyEncoding::Codec,
            Self::V05 | Self::V06 => KeyEncoding::Ordered,
        }
    }

    #[must_use]
    pub const fn list_layout(self) -> ListLayout {
        match self {
            Self::V04 | Self::V05 => ListLayout::Separated,
            Self::V06 => ListLayout::Terminated,
        }
    }

    /// Whether record buckets carry a per-bucket configuration entry.
    #[must_use]
    pub const fn keeps_bucket_config(self) -> bool {
        matches!(self, Self::V04)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

impl TryFrom<String> for Generation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_marker(&value)
    }
}

impl From<Generation> for String {
    fn from(value: Generation) -> Self {
        value.marker().to_string()
    }
}

///
/// KeyEncoding
///
/// How non-string primary keys and KV keys become bytes.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyEncoding {
    Codec,
    Ordered,
}

///
/// ListLayout
///
/// Composite key layout of list-index entries.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListLayout {
    /// `value ++ "__" ++ pk`
    Separated,
    /// `terminated(value) ++ pk`
    Terminated,
}

/// Read the stamped generation, preferring the current metadata bucket over
/// the legacy one. `None` when neither holds a marker.
pub fn read_marker(tx: &impl Read) -> Result<Option<Generation>, Error> {
    for bucket in [METADATA_BUCKET, LEGACY_METADATA_BUCKET] {
        if let Some(raw) = tx.get(bucket, VERSION_KEY)? {
            let marker = String::from_utf8_lossy(&raw);

            return Generation::from_marker(&marker).map(Some);
        }
    }

    Ok(None)
}

/// Write the marker for `generation` into its metadata bucket.
pub fn stamp(tx: &WriteTx, generation: Generation) -> Result<(), Error> {
    let bucket = generation.metadata_bucket();
    tx.create_bucket(bucket)?;
    tx.put(bucket, VERSION_KEY, generation.marker().as_bytes())?;

    Ok(())
}

///
/// TESTS
///
