//! Post approval workflow.
//!
//! ```text
//!   create ──► DRAFT ──submit──► PENDING_APPROVAL ──approve──► APPROVED ──close──► CLOSED
//!                                        │
//!                                        └──reject──► REJECTED
//! ```
//!
//! Every move is a row in [`TRANSITIONS`]. Actor gating is evaluated before
//! the state precondition, so an unauthorized actor is always told so
//! regardless of where the post currently sits.

use std::fmt;

use thiserror::Error;

use crate::models::PostStatus;

/// PostAction
///
/// An explicit, actor-triggered state change on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostAction {
    Submit,
    Approve,
    Reject,
    Close,
}

impl PostAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostAction::Submit => "submit",
            PostAction::Approve => "approve",
            PostAction::Reject => "reject",
            PostAction::Close => "close",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            PostAction::Submit => "submitted",
            PostAction::Approve => "approved",
            PostAction::Reject => "rejected",
            PostAction::Close => "closed",
        }
    }

    /// The table row governing this action.
    pub fn transition(self) -> &'static Transition {
        match self {
            PostAction::Submit => &TRANSITIONS[0],
            PostAction::Approve => &TRANSITIONS[1],
            PostAction::Reject => &TRANSITIONS[2],
            PostAction::Close => &TRANSITIONS[3],
        }
    }
}

impl fmt::Display for PostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate
///
/// Who may trigger a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Only the post's author.
    Owner,
    /// Only holders of the ADMIN role, ownership irrelevant.
    Admin,
}

/// Transition
///
/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub action: PostAction,
    pub from: PostStatus,
    pub to: PostStatus,
    pub gate: Gate,
}

pub static TRANSITIONS: [Transition; 4] = [
    Transition {
        action: PostAction::Submit,
        from: PostStatus::Draft,
        to: PostStatus::PendingApproval,
        gate: Gate::Owner,
    },
    Transition {
        action: PostAction::Approve,
        from: PostStatus::PendingApproval,
        to: PostStatus::Approved,
        gate: Gate::Admin,
    },
    Transition {
        action: PostAction::Reject,
        from: PostStatus::PendingApproval,
        to: PostStatus::Rejected,
        gate: Gate::Admin,
    },
    Transition {
        action: PostAction::Close,
        from: PostStatus::Approved,
        to: PostStatus::Closed,
        gate: Gate::Admin,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("{}", not_permitted_message(.action))]
    NotPermitted { action: PostAction },

    #[error("Only posts in {expected} status can be {} (current status: {actual})", .action.past_tense())]
    IllegalTransition {
        action: PostAction,
        expected: PostStatus,
        actual: PostStatus,
    },
}

fn not_permitted_message(action: &PostAction) -> String {
    match action.transition().gate {
        Gate::Owner => format!("You can only {} your own posts", action),
        Gate::Admin => format!("Only administrators can {} posts", action),
    }
}

/// Actor
///
/// The two facts about the caller that transition gating depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub is_admin: bool,
    pub is_owner: bool,
}

impl Actor {
    fn passes(&self, gate: Gate) -> bool {
        match gate {
            Gate::Owner => self.is_owner,
            Gate::Admin => self.is_admin,
        }
    }
}

/// plan
///
/// Checks whether `actor` may apply `action` to a post currently in `current`
/// and returns the status the post moves to.
pub fn plan(action: PostAction, actor: Actor, current: PostStatus) -> Result<PostStatus, LifecycleError> {
    let transition = action.transition();

    if !actor.passes(transition.gate) {
        return Err(LifecycleError::NotPermitted { action });
    }

    if current != transition.from {
        return Err(LifecycleError::IllegalTransition {
            action,
            expected: transition.from,
            actual: current,
        });
    }

    Ok(transition.to)
}

/// can_view
///
/// Read rule shared by single-post reads and the comment gate: admins and
/// the author see a post at any status, everyone else only once approved.
pub fn can_view(actor: Actor, status: PostStatus) -> bool {
    actor.is_admin || actor.is_owner || status == PostStatus::Approved
}
