//! Cache backend trait and shared operation types.

pub(crate) mod filters;
mod mongo;

pub use mongo::MongoBackend;

use std::str::FromStr;

use async_trait::async_trait;
use mongodb::bson::DateTime;

use crate::error::{CacheError, CacheResult};

/// Bulk-removal modes for [`TagCacheBackend::clean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleaningMode {
    /// Remove every record; the tag argument is ignored.
    All,
    /// Remove records whose expiry instant has passed; tags ignored.
    Old,
    /// Remove records whose tag set contains all given tags (AND).
    MatchingTag,
    /// Remove records whose tag set contains none of the given tags (NOT).
    NotMatchingTag,
    /// Remove records whose tag set contains at least one given tag (OR).
    MatchingAnyTag,
}

impl CleaningMode {
    /// The configuration-string spelling of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Old => "old",
            Self::MatchingTag => "matchingTag",
            Self::NotMatchingTag => "notMatchingTag",
            Self::MatchingAnyTag => "matchingAnyTag",
        }
    }
}

impl FromStr for CleaningMode {
    type Err = CacheError;

    /// Parse a configuration-string mode.
    ///
    /// An unknown mode is a configuration error, never a silent no-op.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "old" => Ok(Self::Old),
            "matchingTag" => Ok(Self::MatchingTag),
            "notMatchingTag" => Ok(Self::NotMatchingTag),
            "matchingAnyTag" => Ok(Self::MatchingAnyTag),
            other => Err(CacheError::InvalidCleaningMode(other.to_owned())),
        }
    }
}

/// Static capability flags a backend reports to the cache frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Expired records are removed without frontend involvement.
    pub automatic_cleaning: bool,
    /// Tags are supported.
    pub tags: bool,
    /// Expired records can still be read (`skip_validity` on load).
    pub expired_read: bool,
    /// Priority levels are honored when saving.
    pub priority: bool,
    /// Records can live forever.
    pub infinite_lifetime: bool,
    /// Ids and the complete tag list can be enumerated.
    pub get_list: bool,
}

/// Metadata for a stored record, as reported to the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Absolute expiry instant; `None` for infinite lifetime.
    pub expire: Option<DateTime>,
    /// Tags attached to the record.
    pub tags: Vec<String>,
    /// Creation (last full-rewrite) instant.
    pub mtime: DateTime,
}

/// Storage backend for a tag-aware, TTL-expiring cache.
///
/// Fault handling follows two rules. The read and save paths (`load`,
/// `test`, `save`, `touch`, `metadata`) swallow store faults: they log a
/// warning and report a miss or `false`, so a flapping store degrades the
/// cache instead of breaking the frontend. The invalidation and listing
/// paths (`remove`, `clean`, the id listings, `tags`) propagate faults,
/// since a failed invalidation is something the caller must act on.
#[async_trait]
pub trait TagCacheBackend: Send + Sync {
    /// Load the payload stored under `id`.
    ///
    /// Returns `None` when the record is absent or expired; with
    /// `skip_validity` the expiry check is bypassed, so a logically expired
    /// record can still be read until the store physically removes it.
    async fn load(&self, id: &str, skip_validity: bool) -> Option<Vec<u8>>;

    /// Existence probe: the record's creation instant, ignoring expiry.
    async fn test(&self, id: &str) -> Option<DateTime>;

    /// Store `payload` under `id` with the given tags and lifetime.
    ///
    /// A lifetime of zero or `None` means infinite. An existing record
    /// under the same id is replaced wholesale (tags and hit counter
    /// included).
    async fn save(&self, id: &str, payload: Vec<u8>, tags: &[String], lifetime: Option<u64>) -> bool;

    /// Delete the record stored under `id`.
    ///
    /// Returns whether a record was actually deleted.
    async fn remove(&self, id: &str) -> CacheResult<bool>;

    /// Extend the record's expiry by `extra_lifetime` seconds.
    ///
    /// The extension is measured from the record's current expiry instant,
    /// not from now. A record that is absent, infinite, or already expired
    /// is left alone and `false` is returned.
    async fn touch(&self, id: &str, extra_lifetime: u64) -> bool;

    /// Bulk-remove records according to `mode`; returns the removed count.
    async fn clean(&self, mode: CleaningMode, tags: &[String]) -> CacheResult<u64>;

    /// All stored ids.
    async fn ids(&self) -> CacheResult<Vec<String>>;

    /// Ids whose tag set contains every given tag.
    async fn ids_matching_tags(&self, tags: &[String]) -> CacheResult<Vec<String>>;

    /// Ids whose tag set contains none of the given tags.
    async fn ids_not_matching_tags(&self, tags: &[String]) -> CacheResult<Vec<String>>;

    /// Ids whose tag set contains at least one of the given tags.
    async fn ids_matching_any_tags(&self, tags: &[String]) -> CacheResult<Vec<String>>;

    /// All distinct tags across all records.
    async fn tags(&self) -> CacheResult<Vec<String>>;

    /// Expiry, tags and modification time of the record under `id`.
    async fn metadata(&self, id: &str) -> Option<Metadata>;

    /// Static capability flags of this backend.
    fn capabilities(&self) -> Capabilities;

    /// How full the backend is, as a percentage.
    ///
    /// There is no way to compute remaining space for a capped-less MongoDB
    /// collection, so this is a constant placeholder.
    fn filling_percentage(&self) -> u8 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_mode_parses_known_spellings() {
        for mode in [
            CleaningMode::All,
            CleaningMode::Old,
            CleaningMode::MatchingTag,
            CleaningMode::NotMatchingTag,
            CleaningMode::MatchingAnyTag,
        ] {
            let parsed: CleaningMode =
                mode.as_str().parse().expect("failed to parse known mode");
            assert_eq!(parsed, mode);
        }
    }

    #[test]
    fn unknown_cleaning_mode_is_a_config_error() {
        let err = "newest".parse::<CleaningMode>().expect_err("expected parse failure");
        assert!(matches!(err, CacheError::InvalidCleaningMode(ref mode) if mode == "newest"));
    }

    #[test]
    fn cleaning_mode_spelling_is_case_sensitive() {
        assert!("MATCHINGTAG".parse::<CleaningMode>().is_err());
    }
}
