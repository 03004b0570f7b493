//! Provider conformance suite, run against the in-memory provider.
//!
//! Every networked provider implements the same conditional semantics, so
//! the behavioral contract is pinned down here once.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use leaselock::{InMemoryLeaseProvider, LeaseError, LeaseProviderExt};
use support::{CountingProvider, FailingReleaseProvider};

const TEN_MINUTES: Duration = Duration::from_secs(600);
const ZERO: Duration = Duration::ZERO;

// --- Hold Durations ---

#[tokio::test]
async fn lock_at_least_for_duration() {
    let provider = InMemoryLeaseProvider::new();
    let counter = Arc::new(AtomicUsize::new(0));

    // The first cycle finishes instantly but keeps the lease visibly held
    // for ten minutes; the remaining cycles must observe a denial.
    for _ in 0..5 {
        let counter = counter.clone();
        provider
            .with_lease("lock-at-least-for", TEN_MINUTES, TEN_MINUTES, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lock_at_most_for_duration() {
    let provider = InMemoryLeaseProvider::new();
    let counter = Arc::new(AtomicUsize::new(0));

    // No minimum hold: each release is immediate, so every cycle runs.
    for _ in 0..5 {
        let counter = counter.clone();
        provider
            .with_lease("lock-at-most-for", ZERO, TEN_MINUTES, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn expired_lease_is_reacquirable() {
    let provider = InMemoryLeaseProvider::new();
    let counter = Arc::new(AtomicUsize::new(0));

    // A zero maximum hold expires the record the moment it is written.
    for _ in 0..2 {
        let counter = counter.clone();
        provider
            .with_lease("zero-hold", ZERO, ZERO, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

// --- Mutual Exclusion ---

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_attempt_is_denied_while_action_runs() {
    let provider = InMemoryLeaseProvider::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let delayed = {
        let provider = provider.clone();
        let first = first.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            provider
                .with_lease("contended", ZERO, Duration::from_secs(60), || async move {
                    first.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap()
        })
    };

    let immediate = {
        let provider = provider.clone();
        let second = second.clone();
        tokio::spawn(async move {
            provider
                .with_lease("contended", ZERO, Duration::from_secs(60), || async move {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    second.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap()
        })
    };

    let (delayed, immediate) = (delayed.await.unwrap(), immediate.await.unwrap());

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert!(delayed.is_none());
    assert!(immediate.is_some());
}

// --- Outcomes ---

#[tokio::test]
async fn action_result_propagates() {
    let provider = InMemoryLeaseProvider::new();

    let value = provider
        .with_lease("result", ZERO, TEN_MINUTES, || async { 42 })
        .await
        .unwrap();

    assert_eq!(value, Some(42));
}

#[tokio::test]
async fn denial_resolves_through_if_denied() {
    let provider = InMemoryLeaseProvider::new();

    // Hold the lease, then let a second attempt fall back.
    provider
        .with_lease("fallback", TEN_MINUTES, TEN_MINUTES, || async { "ran" })
        .await
        .unwrap();

    let value = provider
        .with_lease_or(
            "fallback",
            ZERO,
            TEN_MINUTES,
            || async { "ran" },
            || "denied",
        )
        .await
        .unwrap();

    assert_eq!(value, "denied");
}

// --- Validation ---

#[tokio::test]
async fn blank_name_fails_without_store_calls() {
    let provider = CountingProvider::new();

    let result = provider
        .with_lease("  ", ZERO, TEN_MINUTES, || async {})
        .await;

    assert_eq!(result, Err(LeaseError::BlankName));
    assert_eq!(provider.store_calls(), 0);
}

#[tokio::test]
async fn inverted_durations_fail_without_store_calls() {
    let provider = CountingProvider::new();

    let result = provider
        .with_lease("inverted", TEN_MINUTES, ZERO, || async {})
        .await;

    assert_eq!(
        result,
        Err(LeaseError::InvalidDurations {
            at_least_for: TEN_MINUTES,
            at_most_for: ZERO,
        })
    );
    assert_eq!(provider.store_calls(), 0);
}

// --- Release Guarantees ---

#[tokio::test]
async fn release_failure_does_not_mask_action_result() {
    let provider = FailingReleaseProvider::new();

    let value = provider
        .with_lease("flaky-store", ZERO, TEN_MINUTES, || async { "done" })
        .await
        .unwrap();

    assert_eq!(value, Some("done"));
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_action_still_releases() {
    let provider = InMemoryLeaseProvider::new();

    let task = {
        let provider = provider.clone();
        tokio::spawn(async move {
            provider
                .with_lease("panicky", ZERO, TEN_MINUTES, || async {
                    panic!("action blew up");
                })
                .await
        })
    };
    assert!(task.await.is_err());

    // Give the spawned release a moment to land, then reacquire.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let value = provider
        .with_lease("panicky", ZERO, TEN_MINUTES, || async { "recovered" })
        .await
        .unwrap();
    assert_eq!(value, Some("recovered"));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_action_still_releases() {
    let provider = InMemoryLeaseProvider::new();

    let task = {
        let provider = provider.clone();
        tokio::spawn(async move {
            provider
                .with_lease("cancelled", ZERO, TEN_MINUTES, || async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    task.abort();
    assert!(task.await.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;

    let value = provider
        .with_lease("cancelled", ZERO, TEN_MINUTES, || async { "reclaimed" })
        .await
        .unwrap();
    assert_eq!(value, Some("reclaimed"));
}

#[tokio::test]
async fn minimum_hold_survives_early_completion() {
    let provider = InMemoryLeaseProvider::new();

    // Action completes instantly; the lease must still deny a challenger
    // because the minimum hold has not elapsed.
    provider
        .with_lease("debounce", TEN_MINUTES, Duration::from_secs(3600), || async {})
        .await
        .unwrap();

    let value = provider
        .with_lease("debounce", ZERO, TEN_MINUTES, || async { "ran" })
        .await
        .unwrap();

    assert_eq!(value, None);
}
