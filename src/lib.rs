//! `mongocache`
//!
//! A tag-aware, TTL-expiring cache storage backend built on a MongoDB
//! collection. It provides the storage primitives for a generic caching
//! frontend: store opaque payloads under string identifiers, attach tags for
//! bulk invalidation, and let MongoDB's native TTL mechanism remove expired
//! records in the background.
//!
//! # Design
//!
//! - **Record codec** ([`record`]): maps an (id, payload, lifetime, tags)
//!   tuple to the persisted document shape and back.
//! - **Index management**: the tag index and the TTL index on `expires_at`
//!   are ensured lazily, once per backend instance, on the first write.
//!   Read paths never pay the setup round trip.
//! - **Query planning**: every cache operation translates to a single
//!   MongoDB filter or update; tag matching uses `$all` (AND), `$in` (OR)
//!   and `$nin` (NOT) over the record's unstructured tag array.
//!
//! # Example
//!
//! ```ignore
//! use mongocache::{MongoBackend, MongoConfig, TagCacheBackend};
//!
//! let config = MongoConfig::new().database("app_cache").collection("pages");
//! let backend = MongoBackend::connect(&config).await?;
//!
//! backend.save("page:1", body, &["pages".into()], Some(300)).await;
//! let cached = backend.load("page:1", false).await;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod record;

pub use backend::{Capabilities, CleaningMode, Metadata, MongoBackend, TagCacheBackend};
pub use config::MongoConfig;
pub use error::{CacheError, CacheResult};
pub use record::CacheRecord;
