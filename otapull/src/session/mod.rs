//! Update session: per-attempt state machine, async driver, and outcome.
//!
//! A session is one logical update attempt, possibly spanning several
//! connections via redirects. The split mirrors the data flow: the
//! [`UpdateSession`] machine decides, the [`SessionRunner`] talks to the
//! transport, the [`UpdateOutcome`] reports.

pub mod machine;
pub mod outcome;
pub mod runner;
pub mod state;

pub use machine::{EventDirective, UpdateSession, MAX_REDIRECT_HOPS};
pub use outcome::{
    UpdateOutcome, RESULT_APPLIED, RESULT_CONNECT_FAILED, RESULT_FAILED, RESULT_NOT_MODIFIED,
};
pub use runner::{SessionRunner, RESTART_DELAY};
pub use state::SessionState;
