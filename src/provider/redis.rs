//! Redis lease provider.
//!
//! Acquisition rides on `SET NX PX` - atomic by construction, with Redis's
//! own active expiry reclaiming stale keys. Release uses `SET XX PX` so a
//! release that arrives after the key has already expired never creates a
//! key from nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};

use crate::error::LeaseError;
use crate::outcome::AcquireOutcome;
use crate::record::{LeaseRecord, LeaseRequest};

use super::LeaseProvider;

/// Prefix namespacing lease keys away from other tenants of the database.
pub const KEY_PREFIX: &str = "lease:";

/// Lease provider backed by a Redis server.
///
/// Values are the JSON encoding of the lease record; the key TTL mirrors the
/// record's `expiresAt` so the store reclaims stale keys on its own.
#[derive(Clone)]
pub struct RedisLeaseProvider {
    client: Client,
}

impl RedisLeaseProvider {
    /// Connect lazily to the given URL (e.g. `redis://localhost:6379`).
    pub fn new(url: &str) -> Result<Self, LeaseError> {
        let client =
            Client::open(url).map_err(|e| LeaseError::Unavailable(format!("redis client: {}", e)))?;
        Ok(RedisLeaseProvider { client })
    }

    pub fn with_host_port(host: &str, port: u16) -> Result<Self, LeaseError> {
        Self::new(&format!("redis://{}:{}", host, port))
    }

    async fn connection(&self) -> Result<MultiplexedConnection, LeaseError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| LeaseError::Unavailable(format!("redis connection: {}", e)))
    }
}

#[async_trait]
impl LeaseProvider for RedisLeaseProvider {
    async fn try_acquire(&self, challenger: &LeaseRequest) -> Result<AcquireOutcome, LeaseError> {
        let now = Utc::now();
        let key = lease_key(&challenger.name);
        let record = challenger.granted(now);
        let value = encode(&record)?;

        let mut conn = self.connection().await?;
        let set: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(challenger.expires_at, now))
            .query_async(&mut conn)
            .await
            .map_err(|e| LeaseError::Protocol(format!("redis SET NX failed: {}", e)))?;

        if set.is_some() {
            return Ok(AcquireOutcome::Granted(record));
        }

        // NX lost: read the incumbent. A missing or already-expired value
        // means the key is stale and active expiry simply has not reclaimed
        // it yet, so the denial resolves to a grant.
        let stored: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| LeaseError::Protocol(format!("redis GET failed: {}", e)))?;

        match stored {
            None => Ok(AcquireOutcome::Granted(record)),
            Some(raw) => {
                let incumbent = decode(&raw)?;
                if incumbent.is_expired(Utc::now()) {
                    Ok(AcquireOutcome::Granted(record))
                } else {
                    Ok(AcquireOutcome::Denied {
                        reason: Some(format!(
                            "held by {} until {}",
                            incumbent.owner, incumbent.expires_at
                        )),
                    })
                }
            }
        }
    }

    async fn release(&self, record: &LeaseRecord) -> Result<(), LeaseError> {
        let key = lease_key(&record.name);
        let value = encode(record)?;

        let mut conn = self.connection().await?;
        // XX: update only while the key still exists; an expired key stays gone.
        let _: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&value)
            .arg("XX")
            .arg("PX")
            .arg(ttl_millis(record.expires_at, Utc::now()))
            .query_async(&mut conn)
            .await
            .map_err(|e| LeaseError::Protocol(format!("redis SET XX failed: {}", e)))?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisLeaseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLeaseProvider").finish_non_exhaustive()
    }
}

fn lease_key(name: &str) -> String {
    format!("{}{}", KEY_PREFIX, name)
}

/// Milliseconds until `expires_at`, clamped to Redis's minimum PX of 1.
fn ttl_millis(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (expires_at - now).num_milliseconds().max(1) as u64
}

fn encode(record: &LeaseRecord) -> Result<String, LeaseError> {
    serde_json::to_string(record)
        .map_err(|e| LeaseError::Protocol(format!("lease record encoding failed: {}", e)))
}

fn decode(raw: &str) -> Result<LeaseRecord, LeaseError> {
    serde_json::from_str(raw)
        .map_err(|e| LeaseError::Protocol(format!("malformed lease record in store: {}", e)))
}
