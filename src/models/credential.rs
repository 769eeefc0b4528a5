//! Represents an access credential served to the authentication layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An access-key credential.
///
/// Independent of bucket and object lifecycle: seeded at bootstrap or
/// written through explicit credential management, never deleted
/// automatically. The engine only stores and looks these up; policy
/// (expiry, rotation) belongs to the authentication layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Credential {
    /// Access-key identifier; the primary key.
    pub access_key: String,

    /// Secret key paired with the access key.
    pub secret_key: String,

    /// Canonical identifier of the owning account.
    pub owner_id: String,

    /// Human-readable display name of the owning account.
    pub display_name: String,

    /// Whether the credential is currently usable.
    pub active: bool,

    /// When this credential was created (UTC, millisecond precision).
    pub created_at: DateTime<Utc>,
}
