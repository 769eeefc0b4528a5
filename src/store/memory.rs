//! In-memory backend over ordered maps.
//!
//! Conforms to the same contract as the SQLite backend: the maps are keyed
//! the way the tables are, ownership cascades are enforced in code, and
//! listing goes through the shared engine so pagination semantics are
//! identical. Useful for tests and for callers that want a catalogue
//! without a database file.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{MetaError, MetaResult};
use crate::listing::{
    self, ListObjectsParams, ListObjectsResult, ListPartsParams, ListPartsResult,
    ListUploadsParams, ListUploadsResult,
};
use crate::models::{Acl, Bucket, Credential, MultipartUpload, Object, Part};
use crate::store::{DeleteObjectsResult, MetadataStore};

#[derive(Default)]
struct Inner {
    buckets: BTreeMap<String, Bucket>,
    /// Keyed by (bucket, key); BTreeMap iteration gives ascending key order.
    objects: BTreeMap<(String, String), Object>,
    uploads: BTreeMap<String, MultipartUpload>,
    /// Keyed by (upload id, part number).
    parts: BTreeMap<(String, i32), Part>,
    credentials: BTreeMap<String, Credential>,
}

impl Inner {
    fn require_bucket(&self, name: &str) -> MetaResult<()> {
        if self.buckets.contains_key(name) {
            Ok(())
        } else {
            Err(MetaError::BucketNotFound(name.to_string()))
        }
    }

    fn upload_matches(&self, bucket: &str, key: &str, upload_id: &str) -> bool {
        self.uploads
            .get(upload_id)
            .is_some_and(|u| u.bucket == bucket && u.key == key)
    }

    fn remove_upload(&mut self, upload_id: &str) {
        self.uploads.remove(upload_id);
        let part_keys: Vec<(String, i32)> = self
            .parts
            .range((upload_id.to_string(), i32::MIN)..=(upload_id.to_string(), i32::MAX))
            .map(|(k, _)| k.clone())
            .collect();
        for k in part_keys {
            self.parts.remove(&k);
        }
    }
}

/// Map-backed [`MetadataStore`].
#[derive(Default)]
pub struct MemoryMetadataStore {
    inner: RwLock<Inner>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_bucket(&self, bucket: &Bucket) -> MetaResult<()> {
        let mut inner = self.inner.write();
        if inner.buckets.contains_key(&bucket.name) {
            return Err(MetaError::BucketAlreadyExists(bucket.name.clone()));
        }
        inner.buckets.insert(bucket.name.clone(), bucket.clone());
        debug!(bucket = %bucket.name, "created bucket");
        Ok(())
    }

    async fn get_bucket(&self, name: &str) -> MetaResult<Option<Bucket>> {
        Ok(self.inner.read().buckets.get(name).cloned())
    }

    async fn bucket_exists(&self, name: &str) -> MetaResult<bool> {
        Ok(self.inner.read().buckets.contains_key(name))
    }

    async fn list_buckets(&self) -> MetaResult<Vec<Bucket>> {
        Ok(self.inner.read().buckets.values().cloned().collect())
    }

    async fn delete_bucket(&self, name: &str) -> MetaResult<()> {
        let mut inner = self.inner.write();
        inner.require_bucket(name)?;
        let has_objects = inner.objects.keys().any(|(b, _)| b == name);
        let has_uploads = inner.uploads.values().any(|u| u.bucket == name);
        if has_objects || has_uploads {
            return Err(MetaError::BucketNotEmpty(name.to_string()));
        }
        inner.buckets.remove(name);
        debug!(bucket = %name, "deleted bucket");
        Ok(())
    }

    async fn put_bucket_acl(&self, name: &str, acl: &Acl) -> MetaResult<()> {
        let mut inner = self.inner.write();
        match inner.buckets.get_mut(name) {
            Some(bucket) => {
                bucket.acl = acl.clone();
                Ok(())
            }
            None => Err(MetaError::BucketNotFound(name.to_string())),
        }
    }

    async fn put_object(&self, object: &Object) -> MetaResult<()> {
        let mut inner = self.inner.write();
        inner.require_bucket(&object.bucket)?;
        inner.objects.insert(
            (object.bucket.clone(), object.key.clone()),
            object.clone(),
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> MetaResult<Option<Object>> {
        Ok(self
            .inner
            .read()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> MetaResult<bool> {
        Ok(self
            .inner
            .read()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> MetaResult<bool> {
        let mut inner = self.inner.write();
        inner.require_bucket(bucket)?;
        Ok(inner
            .objects
            .remove(&(bucket.to_string(), key.to_string()))
            .is_some())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> MetaResult<DeleteObjectsResult> {
        let mut inner = self.inner.write();
        inner.require_bucket(bucket)?;
        let mut outcome = DeleteObjectsResult::default();
        for key in keys {
            inner.objects.remove(&(bucket.to_string(), key.clone()));
            // Absence is success; nothing here can fail per key.
            outcome.deleted.push(key.clone());
        }
        Ok(outcome)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        params: &ListObjectsParams,
    ) -> MetaResult<ListObjectsResult> {
        let inner = self.inner.read();
        inner.require_bucket(bucket)?;
        let max = listing::normalize_max_keys(params.max_keys);
        let delimiter = params.delimiter.as_deref().filter(|d| !d.is_empty());
        let prefix = params.prefix.as_deref().unwrap_or("");
        let resume = params.resume_after.as_deref();

        // Candidate scan in ascending key order; bounded at max + 1 only
        // when no delimiter can collapse keys into shared prefixes.
        let fetch_limit = if delimiter.is_none() {
            max + 1
        } else {
            usize::MAX
        };
        let candidates: Vec<Object> = inner
            .objects
            .range((bucket.to_string(), String::new())..)
            .take_while(|((b, _), _)| b == bucket)
            .map(|(_, obj)| obj)
            .filter(|obj| obj.key.starts_with(prefix))
            .filter(|obj| resume.is_none_or(|marker| obj.key.as_str() > marker))
            .take(fetch_limit)
            .cloned()
            .collect();

        Ok(match delimiter {
            Some(delim) => listing::group_and_truncate(
                candidates,
                params.prefix.as_deref(),
                delim,
                resume,
                max,
            ),
            None => listing::paginate_plain(candidates, max),
        })
    }

    async fn create_multipart_upload(&self, upload: &MultipartUpload) -> MetaResult<String> {
        let mut inner = self.inner.write();
        inner.require_bucket(&upload.bucket)?;
        let mut upload = upload.clone();
        if upload.upload_id.is_empty() {
            upload.upload_id = Uuid::new_v4().simple().to_string();
        }
        if inner.uploads.contains_key(&upload.upload_id) {
            return Err(MetaError::UploadAlreadyExists(upload.upload_id));
        }
        let upload_id = upload.upload_id.clone();
        inner.uploads.insert(upload_id.clone(), upload);
        Ok(upload_id)
    }

    async fn get_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<Option<MultipartUpload>> {
        let inner = self.inner.read();
        Ok(inner
            .uploads
            .get(upload_id)
            .filter(|u| u.bucket == bucket && u.key == key)
            .cloned())
    }

    async fn put_part(&self, part: &Part) -> MetaResult<()> {
        if part.part_number < 1 {
            return Err(MetaError::InvalidArgument(format!(
                "part number must be positive, got {}",
                part.part_number
            )));
        }
        let mut inner = self.inner.write();
        if !inner.uploads.contains_key(&part.upload_id) {
            return Err(MetaError::NoSuchUpload(part.upload_id.clone()));
        }
        inner
            .parts
            .insert((part.upload_id.clone(), part.part_number), part.clone());
        Ok(())
    }

    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        params: &ListPartsParams,
    ) -> MetaResult<ListPartsResult> {
        let inner = self.inner.read();
        if !inner.upload_matches(bucket, key, upload_id) {
            return Err(MetaError::NoSuchUpload(upload_id.to_string()));
        }
        let max = listing::normalize_max_keys(params.max_parts);
        let marker = params.part_number_marker.unwrap_or(0);

        let parts: Vec<Part> = inner
            .parts
            .range((upload_id.to_string(), i32::MIN)..=(upload_id.to_string(), i32::MAX))
            .map(|(_, p)| p)
            .filter(|p| p.part_number > marker)
            .take(max + 1)
            .cloned()
            .collect();

        let (parts, is_truncated) = listing::truncate_page(parts, max);
        let next_part_number_marker = if is_truncated {
            parts.last().map(|p| p.part_number)
        } else {
            None
        };
        Ok(ListPartsResult {
            parts,
            is_truncated,
            next_part_number_marker,
        })
    }

    async fn list_multipart_uploads(
        &self,
        bucket: &str,
        params: &ListUploadsParams,
    ) -> MetaResult<ListUploadsResult> {
        let inner = self.inner.read();
        inner.require_bucket(bucket)?;
        let max = listing::normalize_max_keys(params.max_uploads);
        let prefix = params.prefix.as_deref().unwrap_or("");

        let mut uploads: Vec<MultipartUpload> = inner
            .uploads
            .values()
            .filter(|u| u.bucket == bucket && u.key.starts_with(prefix))
            .filter(|u| match params.key_marker.as_deref() {
                None => true,
                Some(key_marker) => match params.upload_id_marker.as_deref() {
                    Some(id_marker) => {
                        u.key.as_str() > key_marker
                            || (u.key == key_marker && u.upload_id.as_str() > id_marker)
                    }
                    None => u.key.as_str() > key_marker,
                },
            })
            .cloned()
            .collect();
        uploads.sort_by(|a, b| (&a.key, &a.upload_id).cmp(&(&b.key, &b.upload_id)));
        uploads.truncate(max + 1);

        let (uploads, is_truncated) = listing::truncate_page(uploads, max);
        let (next_key_marker, next_upload_id_marker) = if is_truncated {
            match uploads.last() {
                Some(last) => (Some(last.key.clone()), Some(last.upload_id.clone())),
                None => (None, None),
            }
        } else {
            (None, None)
        };
        Ok(ListUploadsResult {
            uploads,
            is_truncated,
            next_key_marker,
            next_upload_id_marker,
        })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        object: &Object,
    ) -> MetaResult<()> {
        if object.bucket != bucket || object.key != key {
            return Err(MetaError::InvalidArgument(
                "completed object must target the upload's bucket and key".into(),
            ));
        }
        // Single write lock: the object swap and upload removal are one
        // atomic step for any concurrent reader.
        let mut inner = self.inner.write();
        if !inner.upload_matches(bucket, key, upload_id) {
            return Err(MetaError::NoSuchUpload(upload_id.to_string()));
        }
        inner
            .objects
            .insert((bucket.to_string(), key.to_string()), object.clone());
        inner.remove_upload(upload_id);
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<()> {
        let mut inner = self.inner.write();
        if !inner.upload_matches(bucket, key, upload_id) {
            return Err(MetaError::NoSuchUpload(upload_id.to_string()));
        }
        inner.remove_upload(upload_id);
        Ok(())
    }

    async fn get_credential(&self, access_key: &str) -> MetaResult<Option<Credential>> {
        Ok(self.inner.read().credentials.get(access_key).cloned())
    }

    async fn put_credential(&self, credential: &Credential) -> MetaResult<()> {
        self.inner
            .write()
            .credentials
            .insert(credential.access_key.clone(), credential.clone());
        Ok(())
    }
}
