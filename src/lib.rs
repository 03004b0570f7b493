//! Distributed mutual-exclusion leases backed by a shared external store.
//!
//! A lease is a time-bounded exclusive claim on a named resource. Lock state
//! lives in the store, never in process memory, so independent (possibly
//! co-located) processes can coordinate through the store's single atomic
//! conditional-write primitive.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use leaselock::{InMemoryLeaseProvider, LeaseProviderExt};
//!
//! let provider = InMemoryLeaseProvider::new();
//!
//! // Run the job at most once every ten minutes, cluster-wide.
//! let ran = provider
//!     .with_lease(
//!         "nightly-report",
//!         Duration::from_secs(600),
//!         Duration::from_secs(600),
//!         || async { generate_report().await },
//!     )
//!     .await?;
//!
//! if ran.is_none() {
//!     println!("another node holds the lease");
//! }
//! ```
//!
//! Backends are feature-gated: `redis` enables `RedisLeaseProvider`,
//! `mongodb` enables `MongoLeaseProvider`. The in-memory provider is always
//! available and doubles as the conformance-test vehicle.

mod error;
mod identity;
mod outcome;
mod provider;
mod record;

pub use error::LeaseError;
pub use identity::node_identity;
pub use outcome::AcquireOutcome;
pub use provider::in_memory::InMemoryLeaseProvider;
pub use provider::{LeaseProvider, LeaseProviderExt};
pub use record::{LeaseRecord, LeaseRequest};

#[cfg(feature = "mongodb")]
pub use provider::mongo::MongoLeaseProvider;
#[cfg(feature = "redis")]
pub use provider::redis::RedisLeaseProvider;
