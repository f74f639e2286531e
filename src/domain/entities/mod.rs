//! Engagement state derived from recorded events.
//!
//! - [`OpenState`] / [`OpenOutcome`] - the once-only open transition
//! - [`EmailStats`] - open state plus click counter of one email
//! - [`EventRecord`] - one entry of the append-only event log

pub mod email_state;
pub mod event_record;

pub use email_state::{EmailStats, OpenOutcome, OpenState};
pub use event_record::EventRecord;
