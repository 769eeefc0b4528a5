//! Represents multipart upload sessions and their parts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::acl::Acl;

/// An in-progress multipart upload.
///
/// Carries the descriptive metadata the eventual object will have, so that
/// completion only needs the byte-storage backend's size and composite
/// hash. The row exists from creation until completion (converted into an
/// object and deleted) or abort (deleted with its parts).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MultipartUpload {
    /// Globally unique upload identifier; the primary key. Server-generated
    /// when the caller supplies an empty string.
    pub upload_id: String,

    /// Name of the owning bucket.
    pub bucket: String,

    /// Object key being uploaded.
    pub key: String,

    /// Canonical identifier of the initiating account.
    pub owner_id: String,

    /// Human-readable display name of the initiating account.
    pub owner_display_name: String,

    /// Content type the finished object will carry.
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

    /// Storage class for the finished object.
    pub storage_class: String,

    /// Access-control document for the finished object.
    pub acl: Acl,

    /// User-supplied string-to-string metadata.
    pub metadata: BTreeMap<String, String>,

    /// Timestamp when the upload was initiated (UTC, millisecond precision).
    pub initiated_at: DateTime<Utc>,
}

/// A single uploaded part within a multipart upload session.
///
/// Keyed by (upload id, part number); re-uploading a part number silently
/// replaces the previous record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Part {
    /// Identifier of the owning upload session.
    pub upload_id: String,

    /// Part number (1-based, positive).
    pub part_number: i32,

    /// Size in bytes.
    pub size: i64,

    /// ETag hash for this part.
    pub etag: String,

    /// Timestamp when this part was recorded (UTC, millisecond precision).
    pub last_modified: DateTime<Utc>,
}
