//! The store contract and its conforming backends.
//!
//! [`MetadataStore`] is the single seam between request handlers and the
//! metadata catalogue. Callers hold `Arc<dyn MetadataStore>` injected at
//! startup and never name a concrete backend; every backend must satisfy
//! the same semantics, checked by the shared contract test suite.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryMetadataStore;
pub use sqlite::SqliteMetadataStore;

use async_trait::async_trait;

use crate::errors::MetaResult;
use crate::listing::{
    ListObjectsParams, ListObjectsResult, ListPartsParams, ListPartsResult, ListUploadsParams,
    ListUploadsResult,
};
use crate::models::{Acl, Bucket, Credential, MultipartUpload, Object, Part};

/// Per-key outcome of a batch delete. Matching S3 semantics, a key that was
/// already absent is reported as deleted, never as an error.
#[derive(Debug, Default)]
pub struct DeleteObjectsResult {
    /// Keys that are now absent (deleted or already missing).
    pub deleted: Vec<String>,
    /// Keys whose deletion failed, with the backend message.
    pub errors: Vec<DeleteObjectError>,
}

/// A single failed key within a batch delete.
#[derive(Debug)]
pub struct DeleteObjectError {
    pub key: String,
    pub message: String,
}

/// The metadata catalogue contract.
///
/// Reads that tolerate absence return `Ok(None)` / `Ok(false)`. Mutations
/// are either intrinsically idempotent (deletes), upserts (object, part,
/// credential puts), or fail with a typed collision error (bucket create).
/// Multi-step mutations are atomic: concurrent readers never observe a
/// partial state.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // ---- Buckets ----

    /// Create a bucket. Fails with `BucketAlreadyExists` on name collision.
    async fn create_bucket(&self, bucket: &Bucket) -> MetaResult<()>;

    async fn get_bucket(&self, name: &str) -> MetaResult<Option<Bucket>>;

    async fn bucket_exists(&self, name: &str) -> MetaResult<bool>;

    /// All buckets, ordered by name.
    async fn list_buckets(&self) -> MetaResult<Vec<Bucket>>;

    /// Delete a bucket. Fails with `BucketNotFound` if absent and with
    /// `BucketNotEmpty` while it still owns objects or in-progress uploads.
    async fn delete_bucket(&self, name: &str) -> MetaResult<()>;

    /// Replace the bucket ACL — the only permitted bucket mutation.
    async fn put_bucket_acl(&self, name: &str, acl: &Acl) -> MetaResult<()>;

    // ---- Objects ----

    /// Insert or replace an object record (S3 overwrite semantics).
    /// Fails with `BucketNotFound` if the owning bucket is absent.
    async fn put_object(&self, object: &Object) -> MetaResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> MetaResult<Option<Object>>;

    async fn object_exists(&self, bucket: &str, key: &str) -> MetaResult<bool>;

    /// Delete an object record. Idempotent: returns `Ok(false)` when the
    /// key was already absent.
    async fn delete_object(&self, bucket: &str, key: &str) -> MetaResult<bool>;

    /// Best-effort batch delete with independent per-key outcomes.
    async fn delete_objects(&self, bucket: &str, keys: &[String])
    -> MetaResult<DeleteObjectsResult>;

    /// List object records with S3 prefix/delimiter/pagination semantics.
    async fn list_objects(
        &self,
        bucket: &str,
        params: &ListObjectsParams,
    ) -> MetaResult<ListObjectsResult>;

    // ---- Multipart uploads ----

    /// Record a new upload session and return its identifier. When
    /// `upload.upload_id` is empty a fresh 128-bit random id is generated.
    async fn create_multipart_upload(&self, upload: &MultipartUpload) -> MetaResult<String>;

    async fn get_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<Option<MultipartUpload>>;

    /// Insert or replace a part record. Fails with `NoSuchUpload` if the
    /// upload is absent and `InvalidArgument` for part numbers below 1.
    async fn put_part(&self, part: &Part) -> MetaResult<()>;

    /// List recorded parts in part-number order. Fails with `NoSuchUpload`
    /// if the (bucket, key, upload id) triple does not match.
    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        params: &ListPartsParams,
    ) -> MetaResult<ListPartsResult>;

    /// List in-progress uploads in (key, upload id) order.
    async fn list_multipart_uploads(
        &self,
        bucket: &str,
        params: &ListUploadsParams,
    ) -> MetaResult<ListUploadsResult>;

    /// Atomically convert an upload into `object`: insert/replace the
    /// object record, drop all parts, drop the upload. No partial state is
    /// ever observable. Fails with `NoSuchUpload` on a mismatched triple.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        object: &Object,
    ) -> MetaResult<()>;

    /// Delete an upload and all of its parts. Fails with `NoSuchUpload` on
    /// a mismatched triple, so a wrong key cannot tear down another upload.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<()>;

    // ---- Credentials ----

    async fn get_credential(&self, access_key: &str) -> MetaResult<Option<Credential>>;

    /// Insert or replace a credential record.
    async fn put_credential(&self, credential: &Credential) -> MetaResult<()>;
}
