//! Pure protocol transitions.
//!
//! Every transition takes the current record by reference and returns the next record together
//! with the message to send, if any. Records are never mutated in place, so a failed transition
//! leaves the stored record untouched.

pub mod connection;
pub mod issuance;
pub mod proof_presentation;

use crate::error::{AgentError, AgentErrorKind};

pub(crate) fn state_not_supported(
    record_kind: &str,
    record_id: &str,
    state: &dyn std::fmt::Debug,
    event: &str,
) -> AgentError {
    warn!(
        "{} {} in state {:?} cannot process {}",
        record_kind, record_id, state, event
    );
    AgentError::from_msg(
        AgentErrorKind::ProtocolStateError,
        &format!(
            "{} {} in state {:?} does not support {}",
            record_kind, record_id, state, event
        ),
    )
}
