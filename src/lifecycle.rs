//! Report status transitions, independent of who asks for them.
use crate::report::{Report, ReportStatus};
use crate::types::TimeStamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Edit,
    Submit,
    Approve,
    Reject,
    /// Admin override to any status.
    SetStatus(ReportStatus),
    Delete,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::SetStatus(_) => "set-status",
            Self::Delete => "delete",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot {} a {from} report", .action.name())]
pub struct InvalidTransition {
    pub from: ReportStatus,
    pub action: Action,
}

/// Status after `action`. `None` means the report is removed.
pub fn next_status(
    from: ReportStatus,
    action: Action,
) -> Result<Option<ReportStatus>, InvalidTransition> {
    use ReportStatus::*;

    match (from, action) {
        (Draft, Action::Edit) => Ok(Some(Draft)),
        (Draft, Action::Submit) => Ok(Some(Submitted)),
        (Submitted, Action::Approve) => Ok(Some(Approved)),
        (Submitted, Action::Reject) => Ok(Some(Rejected)),
        (_, Action::SetStatus(target)) => Ok(Some(target)),
        (_, Action::Delete) => Ok(None),
        _ => Err(InvalidTransition { from, action }),
    }
}

/// Moves `report` to `target`, keeping the lifecycle timestamps consistent
/// with the new status.
pub(crate) fn enter(report: &mut Report, target: ReportStatus, feedback: Option<String>) {
    let now = TimeStamp::new();
    match target {
        ReportStatus::Draft => {
            report.submitted_at = None;
            report.approved_at = None;
            report.rejected_at = None;
        }
        ReportStatus::Submitted => {
            report.submitted_at.get_or_insert_with(|| now.clone());
            report.approved_at = None;
            report.rejected_at = None;
        }
        ReportStatus::Approved => {
            report.submitted_at.get_or_insert_with(|| now.clone());
            report.approved_at = Some(now.clone());
            report.rejected_at = None;
        }
        ReportStatus::Rejected => {
            report.submitted_at.get_or_insert_with(|| now.clone());
            report.rejected_at = Some(now.clone());
            report.approved_at = None;
        }
    }
    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        report.supervisor_feedback = Some(feedback);
    }
    report.status = target;
    report.updated_at = now;
}
