//! Error taxonomy for the metadata engine.
//!
//! Lookups that can legitimately find nothing (`get_*`, `*_exists`, listing)
//! return `Ok(None)` / `Ok(false)` and never produce an error for absence.
//! The variants below cover the cases where absence or collision *is* the
//! failure, plus backend-level faults from the persistence layer.

use thiserror::Error;

/// Errors surfaced by [`crate::store::MetadataStore`] implementations.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),

    #[error("bucket `{0}` already exists")]
    BucketAlreadyExists(String),

    /// A bucket still owning objects or in-progress uploads cannot be deleted.
    #[error("bucket `{0}` is not empty")]
    BucketNotEmpty(String),

    /// The upload id does not exist, or the (bucket, key, upload id) triple
    /// does not match the stored row. Both map to S3's `NoSuchUpload`.
    #[error("no such upload `{0}`")]
    NoSuchUpload(String),

    /// A caller-supplied upload id collided with an existing session.
    #[error("upload `{0}` already exists")]
    UploadAlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("malformed timestamp `{0}`")]
    Timestamp(String),
}

/// Coarse classification, sufficient for a protocol layer to map onto
/// S3 error codes without inspecting individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Conflict,
    Invalid,
    Backend,
}

impl MetaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BucketNotFound(_) | Self::NoSuchUpload(_) => ErrorKind::NotFound,
            Self::BucketAlreadyExists(_) | Self::UploadAlreadyExists(_) => {
                ErrorKind::AlreadyExists
            }
            Self::BucketNotEmpty(_) => ErrorKind::Conflict,
            Self::InvalidArgument(_) => ErrorKind::Invalid,
            Self::Database(_) | Self::Serde(_) | Self::Timestamp(_) => ErrorKind::Backend,
        }
    }
}

pub type MetaResult<T> = Result<T, MetaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_taxonomy() {
        assert_eq!(
            MetaError::BucketNotFound("b".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MetaError::BucketAlreadyExists("b".into()).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            MetaError::BucketNotEmpty("b".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            MetaError::NoSuchUpload("u".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MetaError::UploadAlreadyExists("u".into()).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            MetaError::InvalidArgument("part number".into()).kind(),
            ErrorKind::Invalid
        );
    }
}
