//! Reference persistent backend on SQLite.
//!
//! Metadata lives in six tables (schema version marker, buckets, objects,
//! multipart uploads, parts, credentials) with cascading foreign keys
//! mirroring entity ownership. The connection is configured for WAL
//! journaling with a bounded busy timeout, so concurrent readers proceed
//! while writers serialize; lock timeouts surface as retryable backend
//! errors. Multi-step mutations run inside a single transaction that rolls
//! back on drop and commits only on explicit success.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, QueryBuilder, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::errors::{MetaError, MetaResult};
use crate::listing::{
    self, ListObjectsParams, ListObjectsResult, ListPartsParams, ListPartsResult,
    ListUploadsParams, ListUploadsResult,
};
use crate::models::{Acl, Bucket, Credential, MultipartUpload, Object, Part};
use crate::store::{DeleteObjectError, DeleteObjectsResult, MetadataStore};
use crate::timefmt;

/// Current on-disk schema revision, recorded in `schema_version`.
const SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS buckets (
    name               TEXT PRIMARY KEY,
    region             TEXT NOT NULL,
    owner_id           TEXT NOT NULL,
    owner_display_name TEXT NOT NULL,
    acl                TEXT NOT NULL,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS objects (
    bucket              TEXT NOT NULL REFERENCES buckets(name) ON DELETE CASCADE,
    key                 TEXT NOT NULL,
    size                INTEGER NOT NULL,
    etag                TEXT NOT NULL,
    content_type        TEXT,
    content_encoding    TEXT,
    content_language    TEXT,
    content_disposition TEXT,
    cache_control       TEXT,
    expires             TEXT,
    storage_class       TEXT NOT NULL,
    acl                 TEXT NOT NULL,
    metadata            TEXT NOT NULL,
    last_modified       TEXT NOT NULL,
    delete_marker       INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (bucket, key)
);

CREATE TABLE IF NOT EXISTS multipart_uploads (
    upload_id           TEXT PRIMARY KEY,
    bucket              TEXT NOT NULL REFERENCES buckets(name) ON DELETE CASCADE,
    key                 TEXT NOT NULL,
    owner_id            TEXT NOT NULL,
    owner_display_name  TEXT NOT NULL,
    content_type        TEXT,
    content_encoding    TEXT,
    content_language    TEXT,
    content_disposition TEXT,
    cache_control       TEXT,
    expires             TEXT,
    storage_class       TEXT NOT NULL,
    acl                 TEXT NOT NULL,
    metadata            TEXT NOT NULL,
    initiated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_uploads_bucket_key
    ON multipart_uploads (bucket, key, upload_id);

CREATE TABLE IF NOT EXISTS multipart_parts (
    upload_id     TEXT NOT NULL REFERENCES multipart_uploads(upload_id) ON DELETE CASCADE,
    part_number   INTEGER NOT NULL CHECK (part_number > 0),
    size          INTEGER NOT NULL,
    etag          TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    PRIMARY KEY (upload_id, part_number)
);

CREATE TABLE IF NOT EXISTS credentials (
    access_key   TEXT PRIMARY KEY,
    secret_key   TEXT NOT NULL,
    owner_id     TEXT NOT NULL,
    display_name TEXT NOT NULL,
    active       INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL
)
"#;

const OBJECT_COLUMNS: &str = "bucket, key, size, etag, content_type, content_encoding, \
     content_language, content_disposition, cache_control, expires, \
     storage_class, acl, metadata, last_modified, delete_marker";

const UPLOAD_COLUMNS: &str = "upload_id, bucket, key, owner_id, owner_display_name, \
     content_type, content_encoding, content_language, content_disposition, \
     cache_control, expires, storage_class, acl, metadata, initiated_at";

/// SQLite-backed [`MetadataStore`].
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Open (or create) the database described by `config`, apply pragmas
    /// and the schema, and return a ready store.
    pub async fn open(config: &StoreConfig) -> MetaResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.apply_schema().await?;
        info!(url = %config.database_url, "opened sqlite metadata store");
        Ok(store)
    }

    /// Apply the embedded schema statement by statement and record the
    /// schema version marker.
    async fn apply_schema(&self) -> MetaResult<()> {
        let statements = SCHEMA_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty());
        for stmt in statements {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
            .bind(SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn require_bucket<'e, E>(executor: E, name: &str) -> MetaResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM buckets WHERE name = ?")
            .bind(name)
            .fetch_optional(executor)
            .await?;
        match row {
            Some(_) => Ok(()),
            None => Err(MetaError::BucketNotFound(name.to_string())),
        }
    }

    /// True if the (bucket, key, upload id) triple matches a stored row.
    async fn upload_matches<'e, E>(
        executor: E,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM multipart_uploads WHERE upload_id = ? AND bucket = ? AND key = ?",
        )
        .bind(upload_id)
        .bind(bucket)
        .bind(key)
        .fetch_optional(executor)
        .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn create_bucket(&self, bucket: &Bucket) -> MetaResult<()> {
        let result = sqlx::query(
            "INSERT INTO buckets (name, region, owner_id, owner_display_name, acl, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&bucket.name)
        .bind(&bucket.region)
        .bind(&bucket.owner_id)
        .bind(&bucket.owner_display_name)
        .bind(serde_json::to_string(&bucket.acl)?)
        .bind(timefmt::to_text(&bucket.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(bucket = %bucket.name, "created bucket");
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => {
                Err(MetaError::BucketAlreadyExists(bucket.name.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_bucket(&self, name: &str) -> MetaResult<Option<Bucket>> {
        let row = sqlx::query_as::<_, BucketRow>(
            "SELECT name, region, owner_id, owner_display_name, acl, created_at
             FROM buckets WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Bucket::try_from).transpose()
    }

    async fn bucket_exists(&self, name: &str) -> MetaResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM buckets WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list_buckets(&self) -> MetaResult<Vec<Bucket>> {
        let rows = sqlx::query_as::<_, BucketRow>(
            "SELECT name, region, owner_id, owner_display_name, acl, created_at
             FROM buckets ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Bucket::try_from).collect()
    }

    async fn delete_bucket(&self, name: &str) -> MetaResult<()> {
        let mut tx = self.pool.begin().await?;

        Self::require_bucket(&mut *tx, name).await?;

        let (objects,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM objects WHERE bucket = ?")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        let (uploads,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM multipart_uploads WHERE bucket = ?")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
        if objects > 0 || uploads > 0 {
            return Err(MetaError::BucketNotEmpty(name.to_string()));
        }

        sqlx::query("DELETE FROM buckets WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(bucket = %name, "deleted bucket");
        Ok(())
    }

    async fn put_bucket_acl(&self, name: &str, acl: &Acl) -> MetaResult<()> {
        let result = sqlx::query("UPDATE buckets SET acl = ? WHERE name = ?")
            .bind(serde_json::to_string(acl)?)
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MetaError::BucketNotFound(name.to_string()));
        }
        Ok(())
    }

    async fn put_object(&self, object: &Object) -> MetaResult<()> {
        Self::require_bucket(&self.pool, &object.bucket).await?;
        upsert_object(&self.pool, object).await?;
        debug!(bucket = %object.bucket, key = %object.key, "put object");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> MetaResult<Option<Object>> {
        let sql = format!("SELECT {OBJECT_COLUMNS} FROM objects WHERE bucket = ? AND key = ?");
        let row = sqlx::query_as::<_, ObjectRow>(&sql)
            .bind(bucket)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Object::try_from).transpose()
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> MetaResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM objects WHERE bucket = ? AND key = ?")
                .bind(bucket)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> MetaResult<bool> {
        Self::require_bucket(&self.pool, bucket).await?;
        let result = sqlx::query("DELETE FROM objects WHERE bucket = ? AND key = ?")
            .bind(bucket)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> MetaResult<DeleteObjectsResult> {
        Self::require_bucket(&self.pool, bucket).await?;
        let mut outcome = DeleteObjectsResult::default();
        for key in keys {
            let result = sqlx::query("DELETE FROM objects WHERE bucket = ? AND key = ?")
                .bind(bucket)
                .bind(key)
                .execute(&self.pool)
                .await;
            match result {
                // A missing key still counts as deleted (S3 delete semantics).
                Ok(_) => outcome.deleted.push(key.clone()),
                Err(err) => outcome.errors.push(DeleteObjectError {
                    key: key.clone(),
                    message: err.to_string(),
                }),
            }
        }
        Ok(outcome)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        params: &ListObjectsParams,
    ) -> MetaResult<ListObjectsResult> {
        Self::require_bucket(&self.pool, bucket).await?;
        let max = listing::normalize_max_keys(params.max_keys);
        let delimiter = params.delimiter.as_deref().filter(|d| !d.is_empty());

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {OBJECT_COLUMNS} FROM objects WHERE bucket = "
        ));
        builder.push_bind(bucket);
        if let Some(prefix) = params.prefix.as_deref()
            && !prefix.is_empty()
        {
            builder.push(" AND key LIKE ");
            builder.push_bind(like_pattern(prefix));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(resume) = params.resume_after.as_deref() {
            builder.push(" AND key > ");
            builder.push_bind(resume);
        }
        builder.push(" ORDER BY key ASC");
        // With a delimiter the full candidate set is needed: grouping can
        // collapse many keys into one common prefix, so a bounded fetch
        // cannot decide truncation.
        if delimiter.is_none() {
            builder.push(" LIMIT ");
            builder.push_bind((max + 1) as i64);
        }

        let rows: Vec<ObjectRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        let objects = rows
            .into_iter()
            .map(Object::try_from)
            .collect::<MetaResult<Vec<_>>>()?;

        Ok(match delimiter {
            Some(delim) => listing::group_and_truncate(
                objects,
                params.prefix.as_deref(),
                delim,
                params.resume_after.as_deref(),
                max,
            ),
            None => listing::paginate_plain(objects, max),
        })
    }

    async fn create_multipart_upload(&self, upload: &MultipartUpload) -> MetaResult<String> {
        Self::require_bucket(&self.pool, &upload.bucket).await?;
        let upload_id = if upload.upload_id.is_empty() {
            Uuid::new_v4().simple().to_string()
        } else {
            upload.upload_id.clone()
        };

        let sql = format!(
            "INSERT INTO multipart_uploads ({UPLOAD_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        let result = sqlx::query(&sql)
            .bind(&upload_id)
            .bind(&upload.bucket)
            .bind(&upload.key)
            .bind(&upload.owner_id)
            .bind(&upload.owner_display_name)
            .bind(&upload.content_type)
            .bind(&upload.content_encoding)
            .bind(&upload.content_language)
            .bind(&upload.content_disposition)
            .bind(&upload.cache_control)
            .bind(&upload.expires)
            .bind(&upload.storage_class)
            .bind(serde_json::to_string(&upload.acl)?)
            .bind(serde_json::to_string(&upload.metadata)?)
            .bind(timefmt::to_text(&upload.initiated_at))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                debug!(bucket = %upload.bucket, key = %upload.key, upload_id = %upload_id,
                       "created multipart upload");
                Ok(upload_id)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(MetaError::UploadAlreadyExists(upload_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<Option<MultipartUpload>> {
        let sql = format!(
            "SELECT {UPLOAD_COLUMNS} FROM multipart_uploads
             WHERE upload_id = ? AND bucket = ? AND key = ?"
        );
        let row = sqlx::query_as::<_, UploadRow>(&sql)
            .bind(upload_id)
            .bind(bucket)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MultipartUpload::try_from).transpose()
    }

    async fn put_part(&self, part: &Part) -> MetaResult<()> {
        if part.part_number < 1 {
            return Err(MetaError::InvalidArgument(format!(
                "part number must be positive, got {}",
                part.part_number
            )));
        }
        // One transaction, so a concurrent abort cannot slip between the
        // existence check and the insert and turn `NoSuchUpload` into a raw
        // foreign-key error.
        let mut tx = self.pool.begin().await?;
        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM multipart_uploads WHERE upload_id = ?")
                .bind(&part.upload_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(MetaError::NoSuchUpload(part.upload_id.clone()));
        }

        sqlx::query(
            "INSERT INTO multipart_parts (upload_id, part_number, size, etag, last_modified)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(upload_id, part_number) DO UPDATE SET
                 size = excluded.size,
                 etag = excluded.etag,
                 last_modified = excluded.last_modified",
        )
        .bind(&part.upload_id)
        .bind(part.part_number)
        .bind(part.size)
        .bind(&part.etag)
        .bind(timefmt::to_text(&part.last_modified))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        params: &ListPartsParams,
    ) -> MetaResult<ListPartsResult> {
        if !Self::upload_matches(&self.pool, bucket, key, upload_id).await? {
            return Err(MetaError::NoSuchUpload(upload_id.to_string()));
        }
        let max = listing::normalize_max_keys(params.max_parts);
        let marker = params.part_number_marker.unwrap_or(0);

        let rows = sqlx::query_as::<_, PartRow>(
            "SELECT upload_id, part_number, size, etag, last_modified
             FROM multipart_parts
             WHERE upload_id = ? AND part_number > ?
             ORDER BY part_number ASC LIMIT ?",
        )
        .bind(upload_id)
        .bind(marker)
        .bind((max + 1) as i64)
        .fetch_all(&self.pool)
        .await?;
        let parts = rows
            .into_iter()
            .map(Part::try_from)
            .collect::<MetaResult<Vec<_>>>()?;

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
        Self::require_bucket(&self.pool, bucket).await?;
        let max = listing::normalize_max_keys(params.max_uploads);

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {UPLOAD_COLUMNS} FROM multipart_uploads WHERE bucket = "
        ));
        builder.push_bind(bucket);
        if let Some(prefix) = params.prefix.as_deref()
            && !prefix.is_empty()
        {
            builder.push(" AND key LIKE ");
            builder.push_bind(like_pattern(prefix));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(key_marker) = params.key_marker.as_deref() {
            match params.upload_id_marker.as_deref() {
                // The upload id breaks ties between uploads for one key.
                Some(id_marker) => {
                    builder.push(" AND (key > ");
                    builder.push_bind(key_marker);
                    builder.push(" OR (key = ");
                    builder.push_bind(key_marker);
                    builder.push(" AND upload_id > ");
                    builder.push_bind(id_marker);
                    builder.push("))");
                }
                None => {
                    builder.push(" AND key > ");
                    builder.push_bind(key_marker);
                }
            }
        }
        builder.push(" ORDER BY key ASC, upload_id ASC LIMIT ");
        builder.push_bind((max + 1) as i64);

        let rows: Vec<UploadRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        let uploads = rows
            .into_iter()
            .map(MultipartUpload::try_from)
            .collect::<MetaResult<Vec<_>>>()?;

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

        // One transaction: readers never observe the object without the
        // upload having vanished, or vice versa.
        let mut tx = self.pool.begin().await?;
        if !Self::upload_matches(&mut *tx, bucket, key, upload_id).await? {
            return Err(MetaError::NoSuchUpload(upload_id.to_string()));
        }
        upsert_object(&mut *tx, object).await?;
        sqlx::query("DELETE FROM multipart_parts WHERE upload_id = ?")
            .bind(upload_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM multipart_uploads WHERE upload_id = ?")
            .bind(upload_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(bucket = %bucket, key = %key, upload_id = %upload_id,
              size = object.size, "completed multipart upload");
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> MetaResult<()> {
        let mut tx = self.pool.begin().await?;
        if !Self::upload_matches(&mut *tx, bucket, key, upload_id).await? {
            return Err(MetaError::NoSuchUpload(upload_id.to_string()));
        }
        sqlx::query("DELETE FROM multipart_parts WHERE upload_id = ?")
            .bind(upload_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM multipart_uploads WHERE upload_id = ?")
            .bind(upload_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(bucket = %bucket, key = %key, upload_id = %upload_id,
               "aborted multipart upload");
        Ok(())
    }

    async fn get_credential(&self, access_key: &str) -> MetaResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT access_key, secret_key, owner_id, display_name, active, created_at
             FROM credentials WHERE access_key = ?",
        )
        .bind(access_key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Credential::try_from).transpose()
    }

    async fn put_credential(&self, credential: &Credential) -> MetaResult<()> {
        sqlx::query(
            "INSERT INTO credentials (access_key, secret_key, owner_id, display_name, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(access_key) DO UPDATE SET
                 secret_key = excluded.secret_key,
                 owner_id = excluded.owner_id,
                 display_name = excluded.display_name,
                 active = excluded.active,
                 created_at = excluded.created_at",
        )
        .bind(&credential.access_key)
        .bind(&credential.secret_key)
        .bind(&credential.owner_id)
        .bind(&credential.display_name)
        .bind(credential.active)
        .bind(timefmt::to_text(&credential.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Insert or replace an object row; shared by `put_object` and multipart
/// completion (which runs it inside the completion transaction).
async fn upsert_object<'e, E>(executor: E, object: &Object) -> MetaResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO objects (
             bucket, key, size, etag, content_type, content_encoding,
             content_language, content_disposition, cache_control, expires,
             storage_class, acl, metadata, last_modified, delete_marker
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(bucket, key) DO UPDATE SET
             size = excluded.size,
             etag = excluded.etag,
             content_type = excluded.content_type,
             content_encoding = excluded.content_encoding,
             content_language = excluded.content_language,
             content_disposition = excluded.content_disposition,
             cache_control = excluded.cache_control,
             expires = excluded.expires,
             storage_class = excluded.storage_class,
             acl = excluded.acl,
             metadata = excluded.metadata,
             last_modified = excluded.last_modified,
             delete_marker = excluded.delete_marker",
    )
    .bind(&object.bucket)
    .bind(&object.key)
    .bind(object.size)
    .bind(&object.etag)
    .bind(&object.content_type)
    .bind(&object.content_encoding)
    .bind(&object.content_language)
    .bind(&object.content_disposition)
    .bind(&object.cache_control)
    .bind(&object.expires)
    .bind(&object.storage_class)
    .bind(serde_json::to_string(&object.acl)?)
    .bind(serde_json::to_string(&object.metadata)?)
    .bind(timefmt::to_text(&object.last_modified))
    .bind(object.delete_marker)
    .execute(executor)
    .await?;
    Ok(())
}

/// Escape LIKE wildcards in a user-supplied prefix so it matches literally.
fn like_pattern(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Return true if the SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

// ---- Row representations ----
//
// Timestamps, ACLs, and metadata maps are stored as text; these private
// row structs are the only place raw column text is decoded into the
// typed model.

#[derive(sqlx::FromRow)]
struct BucketRow {
    name: String,
    region: String,
    owner_id: String,
    owner_display_name: String,
    acl: String,
    created_at: String,
}

impl TryFrom<BucketRow> for Bucket {
    type Error = MetaError;

    fn try_from(row: BucketRow) -> MetaResult<Self> {
        Ok(Bucket {
            name: row.name,
            region: row.region,
            owner_id: row.owner_id,
            owner_display_name: row.owner_display_name,
            acl: serde_json::from_str(&row.acl)?,
            created_at: timefmt::from_text(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ObjectRow {
    bucket: String,
    key: String,
    size: i64,
    etag: String,
    content_type: Option<String>,
    content_encoding: Option<String>,
    content_language: Option<String>,
    content_disposition: Option<String>,
    cache_control: Option<String>,
    expires: Option<String>,
    storage_class: String,
    acl: String,
    metadata: String,
    last_modified: String,
    delete_marker: bool,
}

impl TryFrom<ObjectRow> for Object {
    type Error = MetaError;

    fn try_from(row: ObjectRow) -> MetaResult<Self> {
        let acl: Acl = serde_json::from_str(&row.acl)?;
        let metadata: BTreeMap<String, String> = serde_json::from_str(&row.metadata)?;
        let last_modified: DateTime<Utc> = timefmt::from_text(&row.last_modified)?;
        Ok(Object {
            bucket: row.bucket,
            key: row.key,
            size: row.size,
            etag: row.etag,
            content_type: row.content_type,
            content_encoding: row.content_encoding,
            content_language: row.content_language,
            content_disposition: row.content_disposition,
            cache_control: row.cache_control,
            expires: row.expires,
            storage_class: row.storage_class,
            acl,
            metadata,
            last_modified,
            delete_marker: row.delete_marker,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UploadRow {
    upload_id: String,
    bucket: String,
    key: String,
    owner_id: String,
    owner_display_name: String,
    content_type: Option<String>,
    content_encoding: Option<String>,
    content_language: Option<String>,
    content_disposition: Option<String>,
    cache_control: Option<String>,
    expires: Option<String>,
    storage_class: String,
    acl: String,
    metadata: String,
    initiated_at: String,
}

impl TryFrom<UploadRow> for MultipartUpload {
    type Error = MetaError;

    fn try_from(row: UploadRow) -> MetaResult<Self> {
        Ok(MultipartUpload {
            upload_id: row.upload_id,
            bucket: row.bucket,
            key: row.key,
            owner_id: row.owner_id,
            owner_display_name: row.owner_display_name,
            content_type: row.content_type,
            content_encoding: row.content_encoding,
            content_language: row.content_language,
            content_disposition: row.content_disposition,
            cache_control: row.cache_control,
            expires: row.expires,
            storage_class: row.storage_class,
            acl: serde_json::from_str(&row.acl)?,
            metadata: serde_json::from_str(&row.metadata)?,
            initiated_at: timefmt::from_text(&row.initiated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PartRow {
    upload_id: String,
    part_number: i32,
    size: i64,
    etag: String,
    last_modified: String,
}

impl TryFrom<PartRow> for Part {
    type Error = MetaError;

    fn try_from(row: PartRow) -> MetaResult<Self> {
        Ok(Part {
            upload_id: row.upload_id,
            part_number: row.part_number,
            size: row.size,
            etag: row.etag,
            last_modified: timefmt::from_text(&row.last_modified)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    access_key: String,
    secret_key: String,
    owner_id: String,
    display_name: String,
    active: bool,
    created_at: String,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = MetaError;

    fn try_from(row: CredentialRow) -> MetaResult<Self> {
        Ok(Credential {
            access_key: row.access_key,
            secret_key: row.secret_key,
            owner_id: row.owner_id,
            display_name: row.display_name,
            active: row.active,
            created_at: timefmt::from_text(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("logs/"), "logs/%");
        assert_eq!(like_pattern("a%b"), "a\\%b%");
        assert_eq!(like_pattern("a_b"), "a\\_b%");
        assert_eq!(like_pattern("a\\b"), "a\\\\b%");
    }

    #[test]
    fn schema_declares_all_six_tables() {
        for table in [
            "schema_version",
            "buckets",
            "objects",
            "multipart_uploads",
            "multipart_parts",
            "credentials",
        ] {
            assert!(
                SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing table {table}"
            );
        }
        assert_eq!(SCHEMA_SQL.matches("ON DELETE CASCADE").count(), 3);
    }
}
