//! Provider wrappers shared by the conformance tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use leaselock::{
    AcquireOutcome, InMemoryLeaseProvider, LeaseError, LeaseProvider, LeaseRecord, LeaseRequest,
};

/// Counts every store call, for asserting that validation failures never
/// reach the store.
#[derive(Clone)]
pub struct CountingProvider {
    inner: InMemoryLeaseProvider,
    calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn new() -> Self {
        CountingProvider {
            inner: InMemoryLeaseProvider::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn store_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeaseProvider for CountingProvider {
    async fn try_acquire(&self, challenger: &LeaseRequest) -> Result<AcquireOutcome, LeaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.try_acquire(challenger).await
    }

    async fn release(&self, record: &LeaseRecord) -> Result<(), LeaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.release(record).await
    }
}

/// Grants normally but fails every release, for asserting that release
/// failures never mask the action's result.
#[derive(Clone)]
pub struct FailingReleaseProvider {
    inner: InMemoryLeaseProvider,
}

impl FailingReleaseProvider {
    pub fn new() -> Self {
        FailingReleaseProvider {
            inner: InMemoryLeaseProvider::new(),
        }
    }
}

#[async_trait]
impl LeaseProvider for FailingReleaseProvider {
    async fn try_acquire(&self, challenger: &LeaseRequest) -> Result<AcquireOutcome, LeaseError> {
        self.inner.try_acquire(challenger).await
    }

    async fn release(&self, _record: &LeaseRecord) -> Result<(), LeaseError> {
        Err(LeaseError::Protocol("release rejected".to_string()))
    }
}
