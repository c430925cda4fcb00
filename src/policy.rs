//! Authorization decisions. Pure functions over the actor, action and report;
//! a `false` answer is turned into an error by the caller.
use crate::actor::Actor;
use crate::lifecycle::{Action, InvalidTransition, next_status};
use crate::report::{Report, ReportStatus};

/// Full answer: the actor holds the right and the report's status admits the action.
pub fn can_perform(actor: &Actor, action: Action, report: &Report) -> bool {
    is_authorized(actor, action, report) && status_admits(actor, action, report.status).is_ok()
}

/// Status half of [`can_perform`]. The transition table, narrowed for owners
/// who may only delete their drafts.
pub fn status_admits(
    actor: &Actor,
    action: Action,
    from: ReportStatus,
) -> Result<Option<ReportStatus>, InvalidTransition> {
    match (actor, action) {
        (Actor::Employee { .. }, Action::Delete) if from != ReportStatus::Draft => {
            Err(InvalidTransition { from, action })
        }
        _ => next_status(from, action),
    }
}

/// Role and ownership half of [`can_perform`].
pub fn is_authorized(actor: &Actor, action: Action, report: &Report) -> bool {
    match (actor, action) {
        (Actor::Employee { id, .. }, Action::Edit | Action::Submit | Action::Delete) => {
            report.employee_id == *id
        }
        (Actor::Employee { .. }, Action::Approve | Action::Reject | Action::SetStatus(_)) => false,

        (Actor::Supervisor { id }, Action::Approve | Action::Reject) => {
            report.supervisor_id.as_deref() == Some(id.as_str())
        }
        (
            Actor::Supervisor { .. },
            Action::Edit | Action::Submit | Action::SetStatus(_) | Action::Delete,
        ) => false,

        (
            Actor::Admin { .. },
            Action::Approve | Action::Reject | Action::SetStatus(_) | Action::Delete,
        ) => true,
        (Actor::Admin { .. }, Action::Edit | Action::Submit) => false,
    }
}

/// Who may see a report at all: its owner, any supervisor, any admin.
pub fn can_view(actor: &Actor, report: &Report) -> bool {
    match actor {
        Actor::Employee { id, .. } => report.employee_id == *id,
        Actor::Supervisor { .. } | Actor::Admin { .. } => true,
    }
}

/// Attachment read access: the owner, the assigned supervisor, any admin.
pub fn can_read_attachments(actor: &Actor, report: &Report) -> bool {
    match actor {
        Actor::Employee { id, .. } => report.employee_id == *id,
        Actor::Supervisor { id } => report.supervisor_id.as_deref() == Some(id.as_str()),
        Actor::Admin { .. } => true,
    }
}

pub fn can_upload_attachment(actor: &Actor, report: &Report) -> bool {
    match actor {
        Actor::Employee { id, .. } => report.employee_id == *id,
        Actor::Supervisor { .. } | Actor::Admin { .. } => false,
    }
}

pub fn can_delete_attachment(actor: &Actor, uploader_id: &str) -> bool {
    match actor {
        Actor::Admin { .. } => true,
        Actor::Employee { id, .. } | Actor::Supervisor { id } => id == uploader_id,
    }
}

/// Reports whose week contains today: reviewers only.
pub fn can_view_current_week(actor: &Actor) -> bool {
    match actor {
        Actor::Supervisor { .. } | Actor::Admin { .. } => true,
        Actor::Employee { .. } => false,
    }
}
