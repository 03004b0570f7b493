use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::LeaseError;
use crate::outcome::AcquireOutcome;
use crate::record::{LeaseRecord, LeaseRequest};

use super::LeaseProvider;

/// Lease provider backed by a process-local map.
///
/// The map mutex stands in for the store's atomic conditional write; it is
/// held across no await point and coordinates nothing beyond map integrity.
/// Useful as a single-process backend and as the conformance-test vehicle -
/// the conditional semantics are exactly those of the networked providers.
#[derive(Clone)]
pub struct InMemoryLeaseProvider {
    leases: Arc<Mutex<HashMap<String, LeaseRecord>>>,
}

impl InMemoryLeaseProvider {
    pub fn new() -> Self {
        InMemoryLeaseProvider {
            leases: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryLeaseProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeaseProvider for InMemoryLeaseProvider {
    async fn try_acquire(&self, challenger: &LeaseRequest) -> Result<AcquireOutcome, LeaseError> {
        let now = Utc::now();
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| LeaseError::Unavailable("lease table poisoned".to_string()))?;

        match leases.get(&challenger.name) {
            Some(existing) if !existing.is_expired(now) => Ok(AcquireOutcome::Denied {
                reason: Some(format!(
                    "held by {} until {}",
                    existing.owner, existing.expires_at
                )),
            }),
            _ => {
                let record = challenger.granted(now);
                leases.insert(challenger.name.clone(), record.clone());
                Ok(AcquireOutcome::Granted(record))
            }
        }
    }

    async fn release(&self, record: &LeaseRecord) -> Result<(), LeaseError> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| LeaseError::Unavailable("lease table poisoned".to_string()))?;

        // Update-if-exists, and only for the owner that was granted the
        // lease: a release arriving after the name was reclaimed is a no-op.
        if let Some(existing) = leases.get_mut(&record.name) {
            if existing.owner == record.owner {
                existing.expires_at = record.expires_at;
            }
        }
        Ok(())
    }
}
