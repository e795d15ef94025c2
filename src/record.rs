//! Cache record type and its persisted document shape.
//!
//! A record is the sole persisted entity. Its document shape is stable
//! across reads and writes:
//!
//! ```text
//! { _id: <string>, d: <binary>, created_at: <datetime>,
//!   expires_at: <datetime | null>, t: [<string>...], hits: <int64> }
//! ```
//!
//! Timestamps are BSON datetimes (integral milliseconds since the epoch) —
//! the store's native timestamp type, and the only type its TTL monitor
//! accepts. A null or absent `expires_at` marks an infinite lifetime and is
//! exempt from automatic removal.

use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{Binary, DateTime};
use serde::{Deserialize, Serialize};

/// A single cache entry as persisted in the backing collection.
///
/// The payload is opaque: it is stored and returned byte-for-byte, never
/// interpreted. Serialization of application objects happens upstream in
/// the cache frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Caller-supplied unique key.
    #[serde(rename = "_id")]
    pub id: String,

    /// Opaque payload bytes.
    #[serde(rename = "d")]
    pub payload: Binary,

    /// Creation (or last full-rewrite) instant.
    pub created_at: DateTime,

    /// Absolute expiry instant; `None` means infinite lifetime.
    ///
    /// A missing field on an existing document is tolerated and read as
    /// infinite.
    #[serde(default)]
    pub expires_at: Option<DateTime>,

    /// Tags attached to this record. Always written, possibly empty; a
    /// missing field is read as the empty set.
    #[serde(rename = "t", default)]
    pub tags: Vec<String>,

    /// Read counter, incremented only when hit counting is enabled.
    #[serde(default)]
    pub hits: i64,
}

impl CacheRecord {
    /// Build a fresh record for `save`.
    ///
    /// Stamps `created_at` with the current instant, derives `expires_at`
    /// from `lifetime` (zero or unset means infinite), and starts the hit
    /// counter at zero. Every save produces a full record like this one;
    /// upserts replace the stored document wholesale, so a re-save resets
    /// `hits` and the tag set rather than merging.
    #[must_use]
    pub fn new(id: impl Into<String>, payload: Vec<u8>, lifetime: Option<u64>, tags: Vec<String>) -> Self {
        let created_at = DateTime::now();
        Self {
            id: id.into(),
            payload: Binary { subtype: BinarySubtype::Generic, bytes: payload },
            created_at,
            expires_at: expiry_after(created_at, lifetime),
            tags,
            hits: 0,
        }
    }

    /// Whether this record's expiry instant lies strictly before `now`.
    ///
    /// Infinite-lifetime records never expire.
    #[must_use]
    pub fn is_expired(&self, now: DateTime) -> bool {
        match self.expires_at {
            Some(at) => at.timestamp_millis() < now.timestamp_millis(),
            None => false,
        }
    }

    /// Consume the record, returning the payload bytes.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload.bytes
    }
}

/// Absolute expiry for a lifetime in seconds counted from `from`.
///
/// A lifetime of zero or `None` means infinite: no expiry instant at all.
pub(crate) fn expiry_after(from: DateTime, lifetime: Option<u64>) -> Option<DateTime> {
    match lifetime {
        Some(secs) if secs > 0 => Some(add_seconds(from, secs)),
        _ => None,
    }
}

/// Shift an instant forward by `secs` seconds, saturating on overflow.
pub(crate) fn add_seconds(at: DateTime, secs: u64) -> DateTime {
    let shift = i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000);
    DateTime::from_millis(at.timestamp_millis().saturating_add(shift))
}
