//! Derived per-email engagement state.

use chrono::{DateTime, Utc};

/// Open state of one email.
///
/// `opened` only ever moves from `false` to `true`. The call that performs that move
/// is the transition's single winner; later opens never reset the flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenState {
    pub opened: bool,
    pub first_opened_at: Option<DateTime<Utc>>,
}

/// Result of applying one accepted open to an [`OpenState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOutcome {
    /// True for exactly one open per email: the one that flipped `opened`.
    pub first_open: bool,
    pub first_opened_at: DateTime<Utc>,
}

impl OpenState {
    /// Applies an open observed at `at`.
    ///
    /// Callers must hold the per-email lock (row lock, mutex) for the duration of the
    /// read-modify-write. When an open that lost the transition carries an earlier
    /// timestamp than the winner (requests stamped before they reached the lock),
    /// `first_opened_at` is lowered to it so the stored value is always the earliest
    /// accepted open.
    pub fn apply_open(&mut self, at: DateTime<Utc>) -> OpenOutcome {
        let first_open = !self.opened;
        self.opened = true;

        let first_opened_at = match self.first_opened_at {
            Some(existing) if existing <= at => existing,
            _ => at,
        };
        self.first_opened_at = Some(first_opened_at);

        OpenOutcome {
            first_open,
            first_opened_at,
        }
    }
}

/// Engagement summary of one email: open state and click counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailStats {
    pub email_id: String,
    pub open: OpenState,
    pub clicks: u64,
}

impl EmailStats {
    pub fn new(email_id: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            open: OpenState::default(),
            clicks: 0,
        }
    }
}
