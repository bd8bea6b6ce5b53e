//! Role-gated booking transition table.
//!
//! The authoritative mapping of `(current status, acting role)` to the set
//! of statuses that may legally follow. Encoded as one explicit table and
//! validated exhaustively at startup, so no transition rule lives in a
//! scattered conditional anywhere else.

use crate::booking::{BookingStatus, Role};

/// Statuses a non-staff role may move a booking to from `from`.
///
/// Staff are handled in [`valid_targets`]: the escape hatch admits any
/// target except a self-transition.
const fn participant_targets(from: BookingStatus, role: Role) -> &'static [BookingStatus] {
    use BookingStatus::{Cancelled, Completed, Confirmed, Disputed, InProgress, Pending};

    match (role, from) {
        (Role::Customer, Pending) => &[Confirmed, Cancelled, Disputed],
        (Role::Customer, Confirmed | InProgress) => &[Cancelled, Disputed],
        (Role::Provider, Pending) => &[Disputed],
        (Role::Provider, Confirmed) => &[InProgress, Disputed],
        (Role::Provider, InProgress) => &[Completed, Disputed],
        // Terminal states have no participant-driven exits.
        (Role::Customer | Role::Provider, Completed | Cancelled | Disputed) => &[],
        // Staff never reach this table.
        (Role::Staff, _) => &[],
    }
}

/// Statuses `role` may move a booking to from `from`.
#[must_use]
pub fn valid_targets(from: BookingStatus, role: Role) -> Vec<BookingStatus> {
    match role {
        Role::Staff => BookingStatus::ALL
            .into_iter()
            .filter(|target| *target != from)
            .collect(),
        Role::Customer | Role::Provider => participant_targets(from, role).to_vec(),
    }
}

/// Whether the table admits `from -> to` for `role`.
#[must_use]
pub fn is_allowed(from: BookingStatus, role: Role, to: BookingStatus) -> bool {
    match role {
        Role::Staff => from != to,
        Role::Customer | Role::Provider => participant_targets(from, role).contains(&to),
    }
}

/// Exhaustively check the table at startup.
///
/// Verifies that no entry self-transitions, that terminal states have no
/// participant exits, that every non-terminal state has at least one exit,
/// and that every non-initial state is reachable as the target of some
/// participant transition.
///
/// # Errors
///
/// Returns a description of the first violated property. A failure here is
/// a programming error in the table and should abort startup.
pub fn validate() -> Result<(), String> {
    let participant_roles = [Role::Customer, Role::Provider];

    for from in BookingStatus::ALL {
        for role in participant_roles {
            let targets = participant_targets(from, role);
            if targets.contains(&from) {
                return Err(format!("self-transition on '{from}' for {role}"));
            }
            if from.is_terminal() && !targets.is_empty() {
                return Err(format!("participant exit from terminal state '{from}'"));
            }
        }

        if !from.is_terminal() {
            let has_exit = participant_roles
                .iter()
                .any(|role| !participant_targets(from, *role).is_empty());
            if !has_exit {
                return Err(format!("unreachable dead end: no exit from '{from}'"));
            }
        }
    }

    for target in BookingStatus::ALL {
        if target == BookingStatus::Pending {
            // Initial state; entered at creation, never by transition.
            continue;
        }
        let reachable = BookingStatus::ALL.into_iter().any(|from| {
            participant_roles
                .iter()
                .any(|role| participant_targets(from, *role).contains(&target))
        });
        if !reachable {
            return Err(format!("orphan state: nothing transitions into '{target}'"));
        }
    }

    Ok(())
}
