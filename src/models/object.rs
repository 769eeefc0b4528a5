//! Represents an object's metadata record within a bucket.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::acl::Acl;

/// Metadata for a single object, addressed by (bucket, key).
///
/// The record never carries payload bytes — size and ETag arrive
/// pre-computed from the byte-storage backend. Put semantics are an
/// upsert: re-putting a key silently replaces the previous record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Object {
    /// Name of the owning bucket.
    pub bucket: String,

    /// Object key (path-like identifier, unique within the bucket).
    pub key: String,

    /// Payload size in bytes.
    pub size: i64,

    /// Content-integrity hash, exposed to clients as the ETag.
    pub etag: String,

    /// Content type (MIME type).
    pub content_type: Option<String>,

    /// Content-Encoding header value.
    pub content_encoding: Option<String>,

    /// Content-Language header value.
    pub content_language: Option<String>,

    /// Content-Disposition header value.
    pub content_disposition: Option<String>,

    /// Cache-Control header value.
    pub cache_control: Option<String>,

    /// Expires header value, stored verbatim.
    pub expires: Option<String>,

    /// Storage class (e.g. STANDARD).
    pub storage_class: String,

    /// Access-control document for the object.
    pub acl: Acl,

    /// User-supplied string-to-string metadata (`x-amz-meta-*`).
    pub metadata: BTreeMap<String, String>,

    /// Timestamp when the object was last written (UTC, millisecond precision).
    pub last_modified: DateTime<Utc>,

    /// Whether this row is a tombstone rather than a live object
    /// (versioning hook; not fully exercised by this core).
    pub delete_marker: bool,
}
