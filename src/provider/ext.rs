//! Guarded execution under a lease - the `with_lease` control flow.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tracing::warn;

use crate::error::LeaseError;
use crate::identity::node_identity;
use crate::outcome::AcquireOutcome;
use crate::record::{LeaseRecord, LeaseRequest};

use super::LeaseProvider;

/// Extension trait running caller-supplied work under a lease.
///
/// The single entry point computes deadlines, attempts the acquisition, runs
/// the action, and guarantees release on every exit path - normal return,
/// panic, and cancellation alike. Acquisition is attempted exactly once; a
/// caller wanting "wait up to N seconds for the lock" loops externally so the
/// primitive composes with any backoff strategy.
#[async_trait]
pub trait LeaseProviderExt: LeaseProvider + Clone + Sized + 'static {
    /// Run `action` under an exclusive lease on `name`.
    ///
    /// Returns `Ok(None)` when another live holder exists (no work done),
    /// `Ok(Some(value))` with the action's result otherwise. The lease stays
    /// visibly held for at least `at_least_for` even if the action finishes
    /// sooner, and becomes reclaimable by anyone after `at_most_for` - there
    /// is no renewal heartbeat, so pick `at_most_for` generously enough to
    /// outlive the action.
    ///
    /// Validation failures (`name` blank, `at_least_for > at_most_for`) error
    /// out before any store interaction. A release-time store failure is
    /// logged and never alters the action's result.
    async fn with_lease<T, F, Fut>(
        &self,
        name: &str,
        at_least_for: Duration,
        at_most_for: Duration,
        action: F,
    ) -> Result<Option<T>, LeaseError>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
    {
        if name.trim().is_empty() {
            return Err(LeaseError::BlankName);
        }
        let invalid = LeaseError::InvalidDurations {
            at_least_for,
            at_most_for,
        };
        if at_least_for > at_most_for {
            return Err(invalid);
        }
        let at_least = chrono::Duration::from_std(at_least_for).map_err(|_| invalid.clone())?;
        let at_most = chrono::Duration::from_std(at_most_for).map_err(|_| invalid)?;

        let now = Utc::now();
        let at_least_until = now + at_least;
        let at_most_until = now + at_most;

        let challenger = LeaseRequest::new(name, node_identity(), at_most_until);

        let record = match self.try_acquire(&challenger).await? {
            AcquireOutcome::Granted(record) => record,
            AcquireOutcome::Denied { .. } => return Ok(None),
        };

        // Armed until the action finishes; a panic or cancellation drops the
        // guard, which spawns the release instead of awaiting it.
        let mut guard = ReleaseGuard {
            provider: self.clone(),
            record: Some(record),
            hold_until: at_least_until,
        };

        let value = action().await;

        if let Some(record) = guard.disarm() {
            let released = released_record(record, at_least_until);
            if let Err(err) = self.release(&released).await {
                warn!(name = %released.name, error = %err, "lease release failed");
            }
        }

        Ok(Some(value))
    }

    /// Like [`with_lease`](Self::with_lease), but resolves a denial through
    /// `if_denied` instead of returning `None`.
    async fn with_lease_or<T, F, Fut, D>(
        &self,
        name: &str,
        at_least_for: Duration,
        at_most_for: Duration,
        action: F,
        if_denied: D,
    ) -> Result<T, LeaseError>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = T> + Send,
        D: FnOnce() -> T + Send,
    {
        match self
            .with_lease(name, at_least_for, at_most_for, action)
            .await?
        {
            Some(value) => Ok(value),
            None => Ok(if_denied()),
        }
    }
}

impl<P: LeaseProvider + Clone + 'static> LeaseProviderExt for P {}

/// The record written back at release time: the minimum-hold deadline while it
/// is still in the future (the lease stays visibly held), otherwise now
/// (immediate release).
fn released_record(mut record: LeaseRecord, hold_until: DateTime<Utc>) -> LeaseRecord {
    let now = Utc::now();
    record.expires_at = if hold_until > now { hold_until } else { now };
    record
}

struct ReleaseGuard<P: LeaseProvider + Clone + 'static> {
    provider: P,
    record: Option<LeaseRecord>,
    hold_until: DateTime<Utc>,
}

impl<P: LeaseProvider + Clone + 'static> ReleaseGuard<P> {
    fn disarm(&mut self) -> Option<LeaseRecord> {
        self.record.take()
    }
}

impl<P: LeaseProvider + Clone + 'static> Drop for ReleaseGuard<P> {
    fn drop(&mut self) {
        let Some(record) = self.record.take() else {
            return;
        };
        let released = released_record(record, self.hold_until);
        let provider = self.provider.clone();
        // Drop cannot await; hand the release to the runtime. Outside a
        // runtime the lease simply ages out at its maximum-hold deadline.
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = provider.release(&released).await {
                    warn!(name = %released.name, error = %err, "lease release failed");
                }
            });
        } else {
            warn!(
                name = %released.name,
                "no runtime available to release lease; it will expire on its own"
            );
        }
    }
}
