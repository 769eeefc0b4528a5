//! Metadata and consistency engine for an S3-compatible object store.
//!
//! Tracks buckets, objects, in-progress multipart uploads, and access
//! credentials — the single source of truth consulted before any
//! byte-level storage operation. The engine is consumed in-process by
//! request handlers through the [`store::MetadataStore`] contract;
//! [`store::SqliteMetadataStore`] is the reference persistent backend and
//! [`store::MemoryMetadataStore`] a map-backed alternative. Object bytes,
//! HTTP, and request signing live elsewhere: this crate only manages the
//! catalogue and its invariants — S3 listing semantics, atomic multipart
//! completion, and ownership cascades.

pub mod config;
pub mod errors;
pub mod listing;
pub mod models;
pub mod store;
mod timefmt;

pub use config::StoreConfig;
pub use errors::{ErrorKind, MetaError, MetaResult};
pub use store::{MemoryMetadataStore, MetadataStore, SqliteMetadataStore};
pub use timefmt::now_millis;
