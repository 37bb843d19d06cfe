//! Review state machine for portfolio action proposals.

use chrono::NaiveDateTime;

use super::corporate_actions_model::{PortfolioAction, ProposalStatus};
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalEvent {
    Approve,
    Reject,
    Apply,
}

/// Every permitted (from, event, to) edge. Anything not listed is a conflict.
const TRANSITIONS: &[(ProposalStatus, ProposalEvent, ProposalStatus)] = &[
    (
        ProposalStatus::Pending,
        ProposalEvent::Approve,
        ProposalStatus::Approved,
    ),
    (
        ProposalStatus::Approved,
        ProposalEvent::Apply,
        ProposalStatus::Applied,
    ),
    (
        ProposalStatus::Pending,
        ProposalEvent::Reject,
        ProposalStatus::Rejected,
    ),
    (
        ProposalStatus::Approved,
        ProposalEvent::Reject,
        ProposalStatus::Rejected,
    ),
];

pub fn next_status(from: ProposalStatus, event: ProposalEvent) -> Result<ProposalStatus> {
    TRANSITIONS
        .iter()
        .find(|(f, e, _)| *f == from && *e == event)
        .map(|(_, _, to)| *to)
        .ok_or_else(|| {
            Error::Conflict(format!(
                "cannot {:?} a proposal in status {}",
                event, from
            ))
        })
}

/// Returns the proposal moved along `event`, stamped with the review or apply time.
pub fn transition(
    proposal: &PortfolioAction,
    event: ProposalEvent,
    at: NaiveDateTime,
) -> Result<PortfolioAction> {
    let status = next_status(proposal.status, event)?;
    let mut next = proposal.clone();
    next.status = status;
    match event {
        ProposalEvent::Approve | ProposalEvent::Reject => next.reviewed_at = Some(at),
        ProposalEvent::Apply => next.applied_at = Some(at),
    }
    Ok(next)
}
