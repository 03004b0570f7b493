use crate::record::LeaseRecord;

/// Result of a single acquisition attempt.
///
/// Exactly one variant is produced per attempt. Store-level failures are not
/// outcomes - they surface as [`LeaseError`](crate::LeaseError) so that
/// "another holder exists" and "the store broke" can never be confused.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquireOutcome {
    /// The lease was granted; carries the record as persisted.
    Granted(LeaseRecord),
    /// A live, unexpired record already occupies the name.
    Denied {
        /// Best-effort description of the current holder, when known.
        reason: Option<String>,
    },
}

impl AcquireOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AcquireOutcome::Granted(_))
    }

    /// The granted record, if any.
    pub fn record(self) -> Option<LeaseRecord> {
        match self {
            AcquireOutcome::Granted(record) => Some(record),
            AcquireOutcome::Denied { .. } => None,
        }
    }
}
