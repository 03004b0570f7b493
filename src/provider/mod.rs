//! Lease providers - one implementation per backing store.
//!
//! A provider translates the two lease operations into atomic store
//! operations and nothing else. Providers share no state, only the contract:
//! two concurrent `try_acquire` calls for the same name must never both
//! observe "no live holder".

mod ext;
pub(crate) mod in_memory;
#[cfg(feature = "mongodb")]
pub(crate) mod mongo;
#[cfg(feature = "redis")]
pub(crate) mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LeaseError;
use crate::outcome::AcquireOutcome;
use crate::record::{LeaseRecord, LeaseRequest};

pub use ext::LeaseProviderExt;

/// Storage contract for lease state.
///
/// Implementations back onto whatever atomic conditional-write primitive the
/// store exposes: `SET NX PX` for key-value stores, a filtered upsert for
/// document stores, a guarded map entry in memory.
#[async_trait]
pub trait LeaseProvider: Send + Sync {
    /// Attempt to acquire the lease in a single atomic conditional write.
    ///
    /// Succeeds only if no live (unexpired) record occupies the name; a live
    /// holder yields `Ok(Denied)`. Any store failure other than contention is
    /// an `Err` - never coerced into a denial.
    async fn try_acquire(&self, challenger: &LeaseRequest) -> Result<AcquireOutcome, LeaseError>;

    /// Overwrite the held record's expiry with the value carried in `record`.
    ///
    /// Conditional on the key still existing: a release that arrives after
    /// the key expired and was reclaimed must be a no-op, not a hijack. The
    /// key is never deleted - the shortened expiry supersedes the record.
    async fn release(&self, record: &LeaseRecord) -> Result<(), LeaseError>;
}

#[async_trait]
impl<P: LeaseProvider + ?Sized> LeaseProvider for Arc<P> {
    async fn try_acquire(&self, challenger: &LeaseRequest) -> Result<AcquireOutcome, LeaseError> {
        (**self).try_acquire(challenger).await
    }

    async fn release(&self, record: &LeaseRecord) -> Result<(), LeaseError> {
        (**self).release(record).await
    }
}
