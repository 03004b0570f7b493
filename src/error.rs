use std::fmt;
use std::time::Duration;

/// Error type for lease operations.
///
/// Contention is *not* an error — a live holder produces
/// [`AcquireOutcome::Denied`](crate::AcquireOutcome::Denied). Only validation
/// failures and genuine store failures surface here, and a store failure is
/// never reinterpreted as contention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// The lease name was blank. Fails before any store interaction.
    BlankName,
    /// `at_least_for` exceeds `at_most_for`, or a duration does not fit in a
    /// timestamp. Fails before any store interaction.
    InvalidDurations {
        at_least_for: Duration,
        at_most_for: Duration,
    },
    /// The backing store could not be reached (connectivity, pool, server
    /// selection).
    Unavailable(String),
    /// The backing store rejected the operation or returned malformed data.
    Protocol(String),
}

impl fmt::Display for LeaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaseError::BlankName => write!(f, "lease name must not be blank"),
            LeaseError::InvalidDurations {
                at_least_for,
                at_most_for,
            } => write!(
                f,
                "invalid lease durations (at_least_for {:?} must not exceed at_most_for {:?})",
                at_least_for, at_most_for
            ),
            LeaseError::Unavailable(msg) => write!(f, "lease store unavailable: {}", msg),
            LeaseError::Protocol(msg) => write!(f, "lease store protocol error: {}", msg),
        }
    }
}

impl std::error::Error for LeaseError {}
