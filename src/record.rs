//! Lease data model - the per-attempt challenger and the held record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A per-attempt claim on a named resource.
///
/// Built by the orchestrator for each acquisition attempt and discarded after
/// use. `expires_at` carries the maximum-hold deadline: the instant at which
/// the lease, if granted, becomes stale and reclaimable by anyone.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaseRequest {
    pub name: String,
    pub owner: String,
    pub expires_at: DateTime<Utc>,
}

impl LeaseRequest {
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        LeaseRequest {
            name: name.into(),
            owner: owner.into(),
            expires_at,
        }
    }

    /// Promote the challenger into the record a successful grant persists.
    pub fn granted(&self, acquired_at: DateTime<Utc>) -> LeaseRecord {
        LeaseRecord {
            name: self.name.clone(),
            owner: self.owner.clone(),
            acquired_at,
            expires_at: self.expires_at,
        }
    }
}

/// A held (or previously held) lease as persisted in the store.
///
/// The persisted `expires_at` is the only arbiter of contention: once it has
/// passed, the record counts as absent for acquisition purposes whether or not
/// the store has physically deleted it. Release supersedes the record by
/// shortening (or keeping) the expiry, never by deleting the key.
///
/// Wire names are camelCase so the JSON value in a key-value store and the
/// field names in a document store agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    pub name: String,
    pub owner: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LeaseRecord {
    /// Whether the record counts as dead at the given instant.
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.expires_at <= at
    }
}
