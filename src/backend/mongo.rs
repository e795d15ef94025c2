//! MongoDB cache backend.
//!
//! One backend instance wraps one collection handle. Every operation is a
//! single driver round trip (`touch` takes two: read then rewrite; a load
//! with hit counting collapses the read and the counter increment into one
//! find-and-modify). Concurrency correctness is delegated entirely to
//! MongoDB's per-document atomicity; this type holds no locks beyond the
//! index-setup guard flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, DateTime, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use tracing::warn;

use crate::config::MongoConfig;
use crate::error::{CacheError, CacheResult};
use crate::record::{self, CacheRecord};

use super::filters;
use super::{Capabilities, CleaningMode, Metadata, TagCacheBackend};

/// Tag-aware, TTL-expiring cache backend on a MongoDB collection.
///
/// Expiration is delegated to the server: the backend maintains a TTL index
/// on `expires_at` with `expireAfterSeconds = 0`, so the server's background
/// sweep removes a record as soon after its expiry as the sweep cadence
/// allows. No application-level sweep loop exists. Until the sweep fires, a
/// logically expired record is filtered out on `load` (unless the caller
/// skips the validity check) and can be purged eagerly with
/// [`CleaningMode::Old`].
pub struct MongoBackend {
    collection: Collection<CacheRecord>,
    increment_hit_counter: bool,
    indexes_ensured: AtomicBool,
}

impl MongoBackend {
    /// Connect to the deployment described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] if the database or collection name is
    /// empty, and [`CacheError::Store`] if the connection string is
    /// rejected by the driver.
    pub async fn connect(config: &MongoConfig) -> CacheResult<Self> {
        if config.database.is_empty() || config.collection.is_empty() {
            return Err(CacheError::Config(
                "database and collection names must be non-empty".to_owned(),
            ));
        }
        let client = Client::with_uri_str(config.connection_string()).await?;
        let collection = client.database(&config.database).collection(&config.collection);
        Ok(Self::with_collection(collection, config.increment_hit_counter))
    }

    /// Wrap an already-constructed collection handle.
    ///
    /// Bypasses host/port/credential configuration entirely; useful when
    /// the application manages its own client (connection pooling,
    /// reconnect wrappers) or in tests.
    #[must_use]
    pub fn with_collection(collection: Collection<CacheRecord>, increment_hit_counter: bool) -> Self {
        Self { collection, increment_hit_counter, indexes_ensured: AtomicBool::new(false) }
    }

    /// The underlying collection handle.
    ///
    /// This is primarily for advanced use cases and testing.
    #[must_use]
    pub fn collection(&self) -> &Collection<CacheRecord> {
        &self.collection
    }

    /// Drop the whole backing collection, records and indexes included.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Store`] if the driver reports a fault.
    pub async fn drop_collection(&self) -> CacheResult<()> {
        self.collection.drop().await?;
        Ok(())
    }

    /// Create the tag index and the TTL index if this instance has not done
    /// so yet.
    ///
    /// Runs on write paths only; read-heavy traffic never pays the setup
    /// round trip. The guard is instance-local and set only after the
    /// creation request succeeds, so a failed attempt is retried on the
    /// next write. Concurrent first writes from several instances may each
    /// issue the request; index creation is idempotent server-side.
    async fn ensure_indexes(&self) -> CacheResult<()> {
        if self.indexes_ensured.load(Ordering::Acquire) {
            return Ok(());
        }
        let tag_index = IndexModel::builder()
            .keys(doc! { "t": 1 })
            .options(IndexOptions::builder().background(true).build())
            .build();
        // expireAfterSeconds = 0: the server removes a document as soon as
        // its expires_at has passed. Null expires_at is exempt.
        let expiry_index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(IndexOptions::builder().background(true).expire_after(Duration::ZERO).build())
            .build();
        self.collection.create_indexes([tag_index, expiry_index]).await?;
        self.indexes_ensured.store(true, Ordering::Release);
        Ok(())
    }

    /// Point lookup, optionally folding the hit-counter increment into the
    /// same round trip via find-and-modify.
    async fn get(&self, id: &str, increment_hits: bool) -> CacheResult<Option<CacheRecord>> {
        let record = if increment_hits {
            self.collection
                .find_one_and_update(filters::by_id(id), doc! { "$inc": { "hits": 1 } })
                .await?
        } else {
            self.collection.find_one(filters::by_id(id)).await?
        };
        Ok(record)
    }

    /// Full-record upsert: an existing record under the same id is replaced
    /// wholesale.
    async fn put(&self, record: CacheRecord) -> CacheResult<()> {
        self.ensure_indexes().await?;
        self.collection.replace_one(filters::by_id(&record.id), &record).upsert(true).await?;
        Ok(())
    }

    /// Ids of all records matching `filter`.
    async fn ids_where(&self, filter: Document) -> CacheResult<Vec<String>> {
        let mut cursor = self.collection.find(filter).await?;
        let mut ids = Vec::new();
        while let Some(record) = cursor.try_next().await? {
            ids.push(record.id);
        }
        Ok(ids)
    }
}

#[async_trait]
impl TagCacheBackend for MongoBackend {
    async fn load(&self, id: &str, skip_validity: bool) -> Option<Vec<u8>> {
        match self.get(id, self.increment_hit_counter).await {
            Ok(Some(record)) => {
                if skip_validity || !record.is_expired(DateTime::now()) {
                    Some(record.into_payload())
                } else {
                    None
                }
            }
            Ok(None) => None,
            Err(err) => {
                warn!(id, error = %err, "cache load failed");
                None
            }
        }
    }

    async fn test(&self, id: &str) -> Option<DateTime> {
        match self.get(id, false).await {
            Ok(Some(record)) => Some(record.created_at),
            Ok(None) => None,
            Err(err) => {
                warn!(id, error = %err, "cache test failed");
                None
            }
        }
    }

    async fn save(&self, id: &str, payload: Vec<u8>, tags: &[String], lifetime: Option<u64>) -> bool {
        let record = CacheRecord::new(id, payload, lifetime, tags.to_vec());
        match self.put(record).await {
            Ok(()) => true,
            Err(err) => {
                warn!(id, error = %err, "cache save failed");
                false
            }
        }
    }

    async fn remove(&self, id: &str) -> CacheResult<bool> {
        self.ensure_indexes().await?;
        let result = self.collection.delete_one(filters::by_id(id)).await?;
        Ok(result.deleted_count > 0)
    }

    async fn touch(&self, id: &str, extra_lifetime: u64) -> bool {
        let record = match self.get(id, false).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(err) => {
                warn!(id, error = %err, "cache touch failed");
                return false;
            }
        };
        // Only a finite, not-yet-expired expiry can be extended.
        let Some(expires_at) = record.expires_at else { return false };
        let now = DateTime::now();
        if expires_at.timestamp_millis() <= now.timestamp_millis() {
            return false;
        }
        // The extension is measured from the current expiry, not from now,
        // and the rewrite is a full one: created_at and hits start over.
        let extended = CacheRecord {
            created_at: now,
            expires_at: Some(record::add_seconds(expires_at, extra_lifetime)),
            hits: 0,
            ..record
        };
        match self.put(extended).await {
            Ok(()) => true,
            Err(err) => {
                warn!(id, error = %err, "cache touch failed");
                false
            }
        }
    }

    async fn clean(&self, mode: CleaningMode, tags: &[String]) -> CacheResult<u64> {
        self.ensure_indexes().await?;
        let filter = filters::cleaning_filter(mode, tags, DateTime::now());
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn ids(&self) -> CacheResult<Vec<String>> {
        self.ids_where(Document::new()).await
    }

    async fn ids_matching_tags(&self, tags: &[String]) -> CacheResult<Vec<String>> {
        self.ids_where(filters::tags_superset(tags)).await
    }

    async fn ids_not_matching_tags(&self, tags: &[String]) -> CacheResult<Vec<String>> {
        self.ids_where(filters::tags_disjoint(tags)).await
    }

    async fn ids_matching_any_tags(&self, tags: &[String]) -> CacheResult<Vec<String>> {
        self.ids_where(filters::tags_intersect(tags)).await
    }

    async fn tags(&self) -> CacheResult<Vec<String>> {
        // A server-side distinct over the tag array flattens and
        // deduplicates in a single pass; no scratch collection is needed.
        let values = self.collection.distinct("t", Document::new()).await?;
        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                Bson::String(tag) => Some(tag),
                _ => None,
            })
            .collect())
    }

    async fn metadata(&self, id: &str) -> Option<Metadata> {
        match self.get(id, false).await {
            Ok(Some(record)) => Some(Metadata {
                expire: record.expires_at,
                tags: record.tags,
                mtime: record.created_at,
            }),
            Ok(None) => None,
            Err(err) => {
                warn!(id, error = %err, "cache metadata lookup failed");
                None
            }
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            automatic_cleaning: true,
            tags: true,
            expired_read: true,
            priority: false,
            infinite_lifetime: true,
            get_list: true,
        }
    }
}
