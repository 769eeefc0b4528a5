//! Core data models for the S3-compatible metadata engine.
//!
//! These entities are the logical catalogue rows: buckets, objects,
//! in-progress multipart uploads with their parts, and access credentials.
//! They serialize naturally as JSON via `serde`; persistent backends map
//! them onto their own row representations at the store boundary.

pub mod acl;
pub mod bucket;
pub mod credential;
pub mod multipart;
pub mod object;

pub use acl::{Acl, Grant, Grantee, Owner, Permission};
pub use bucket::Bucket;
pub use credential::Credential;
pub use multipart::{MultipartUpload, Part};
pub use object::Object;
