//! Typed access-control documents.
//!
//! ACLs are persisted as serialized JSON text for forward-compatibility,
//! but callers only ever see the typed structure below — raw text never
//! crosses the store boundary.

use serde::{Deserialize, Serialize};

/// The identity that owns a bucket or object.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Owner {
    /// Canonical owner identifier.
    pub id: String,

    /// Human-readable display name.
    pub display_name: String,
}

/// The identity a grant applies to.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Grantee {
    /// Canonical grantee identifier.
    pub id: String,

    /// Human-readable display name.
    pub display_name: String,
}

/// Permission levels, mirroring the S3 grant vocabulary.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    FullControl,
    Read,
    Write,
    ReadAcp,
    WriteAcp,
}

/// A single (grantee, permission) pair.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: Permission,
}

/// An access-control list: the owning identity plus its grants.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Acl {
    pub owner: Owner,
    pub grants: Vec<Grant>,
}

impl Acl {
    /// The canned `private` ACL: full control for the owner, nothing else.
    pub fn private(owner: Owner) -> Self {
        let grantee = Grantee {
            id: owner.id.clone(),
            display_name: owner.display_name.clone(),
        };
        Self {
            owner,
            grants: vec![Grant {
                grantee,
                permission: Permission::FullControl,
            }],
        }
    }
}
