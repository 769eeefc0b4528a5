//! Represents a logical bucket — a top-level container for objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::acl::Acl;

/// A storage bucket in the S3-compatible system.
///
/// Buckets act as namespaces for objects and in-progress multipart uploads.
/// Once created, only the ACL may change; everything else is immutable
/// until the bucket is deleted, which requires it to own nothing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Bucket {
    /// Globally unique bucket name; the primary key.
    pub name: String,

    /// Region where the bucket is hosted (e.g. "us-west-2").
    pub region: String,

    /// Canonical identifier of the owning account.
    pub owner_id: String,

    /// Human-readable display name of the owning account.
    pub owner_display_name: String,

    /// Access-control document for the bucket.
    pub acl: Acl,

    /// When this bucket was created (UTC, millisecond precision).
    pub created_at: DateTime<Utc>,
}
