//! Service layer API for report workflow operations
use chrono::{NaiveDate, Utc};
use sled::Batch;

use std::sync::Arc;

use crate::actor::Actor;
use crate::attachment;
use crate::directory::IdentityProvider;
use crate::error::{Error, Result, ValidationError};
use crate::lifecycle::{self, Action};
use crate::messaging::{Message, MessagingEngine};
use crate::policy;
use crate::report::{Report, ReportDraft, ReportStatus};
use crate::store::{Store, encode, keys};
use crate::utils::{hrp, new_id};
use crate::week;

/// Filters for [`ReportService::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportQuery {
    pub week_start: Option<NaiveDate>,
    pub status: Option<ReportStatus>,
}

impl ReportQuery {
    pub fn for_week(mut self, week_start: NaiveDate) -> Self {
        self.week_start = Some(week_start);
        self
    }
    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn matches(&self, report: &Report) -> bool {
        self.week_start
            .is_none_or(|week| report.week_start_date.date() == week)
            && self.status.is_none_or(|status| report.status == status)
    }
}

#[derive(Clone)]
pub struct ReportService {
    store: Store,
    directory: Arc<dyn IdentityProvider>,
    min_task_chars: usize,
    // present when status changes should notify the other party
    notifier: Option<MessagingEngine>,
}

impl ReportService {
    pub fn new(
        store: Store,
        directory: Arc<dyn IdentityProvider>,
        min_task_chars: usize,
        notifier: Option<MessagingEngine>,
    ) -> Self {
        Self {
            store,
            directory,
            min_task_chars,
            notifier,
        }
    }

    /// Create a draft for the acting employee. The supervisor the directory
    /// currently assigns is recorded on the report and does not follow later
    /// reassignments.
    pub fn create(&self, actor: &Actor, draft: ReportDraft) -> Result<Report> {
        if !matches!(actor, Actor::Employee { .. }) {
            return Err(Error::Unauthorized("only employees file reports".into()));
        }
        let (id, supervisor_id) = match self.directory.lookup(actor.id())? {
            Some(Actor::Employee { id, supervisor_id }) => (id, supervisor_id),
            Some(other) => {
                return Err(Error::Unauthorized(format!(
                    "{} is registered as {}",
                    other.id(),
                    other.role()
                )));
            }
            None => return Err(Error::NotFound(format!("actor {}", actor.id()))),
        };
        let draft = draft.validate(self.min_task_chars)?;

        let week_key = keys::week(&id, draft.week_start);
        let _guard = self.store.lock(&week_key)?;
        if self.store.contains(&week_key)? {
            return Err(ValidationError::DuplicateWeek(draft.week_start).into());
        }

        let report = draft.into_report(new_id(hrp::REPORT)?, id, supervisor_id);

        let mut batch = Batch::default();
        batch.insert(keys::report(&report.id).as_bytes(), encode(&report)?);
        batch.insert(week_key.as_bytes(), report.id.as_bytes());
        self.store.apply(batch)?;

        tracing::info!(
            report = %report.id,
            employee = %report.employee_id,
            week = %report.week_start_date,
            "report created"
        );
        Ok(report)
    }

    /// Replace the content of a draft. Owner only.
    pub fn edit(&self, report_id: &str, actor: &Actor, draft: ReportDraft) -> Result<Report> {
        let key = keys::report(report_id);
        let _guard = self.store.lock(&key)?;

        let mut report = self.load_visible(report_id, actor)?;
        self.check(actor, Action::Edit, &report)?;
        let draft = draft.validate(self.min_task_chars)?;

        let mut batch = Batch::default();
        let old_week = keys::week(&report.employee_id, report.week_start_date);
        let new_week = keys::week(&report.employee_id, draft.week_start);
        // held until the batch lands
        let _week_guard = if new_week != old_week {
            let guard = self.store.lock(&new_week)?;
            if self.store.contains(&new_week)? {
                return Err(ValidationError::DuplicateWeek(draft.week_start).into());
            }
            batch.remove(old_week.as_bytes());
            batch.insert(new_week.as_bytes(), report.id.as_bytes());
            Some(guard)
        } else {
            None
        };

        report.apply_draft(draft);
        batch.insert(key.as_bytes(), encode(&report)?);
        self.store.apply(batch)?;

        tracing::info!(report = report_id, "report edited");
        Ok(report)
    }

    pub fn submit(&self, report_id: &str, actor: &Actor) -> Result<Report> {
        let (report, _) = self.transition(report_id, actor, Action::Submit, None)?;

        if let Some(supervisor_id) = &report.supervisor_id {
            let body = format!(
                "Weekly report for week of {} has been submitted by {}",
                report.week_start_date, report.employee_id
            );
            self.notify(actor, supervisor_id, &report, "Weekly Report Submitted", body);
        }
        Ok(report)
    }

    pub fn approve(&self, report_id: &str, actor: &Actor, feedback: Option<&str>) -> Result<Report> {
        let (report, _) = self.transition(report_id, actor, Action::Approve, feedback)?;

        let body = with_feedback(
            format!(
                "Your weekly report for week of {} has been approved",
                report.week_start_date
            ),
            feedback,
        );
        self.notify(actor, &report.employee_id, &report, "Report Approved", body);
        Ok(report)
    }

    pub fn reject(&self, report_id: &str, actor: &Actor, feedback: Option<&str>) -> Result<Report> {
        let (report, _) = self.transition(report_id, actor, Action::Reject, feedback)?;

        let body = with_feedback(
            format!(
                "Your weekly report for week of {} has been rejected",
                report.week_start_date
            ),
            feedback,
        );
        self.notify(actor, &report.employee_id, &report, "Report Rejected", body);
        Ok(report)
    }

    /// Admin override to any status, from any status.
    pub fn set_status(
        &self,
        report_id: &str,
        actor: &Actor,
        target: ReportStatus,
        feedback: Option<&str>,
    ) -> Result<Report> {
        let (report, from) =
            self.transition(report_id, actor, Action::SetStatus(target), feedback)?;

        let body = with_feedback(
            format!(
                "Your weekly report for week of {} status has been changed from {} to {}",
                report.week_start_date, from, target
            ),
            feedback,
        );
        self.notify(actor, &report.employee_id, &report, "Report Status Changed", body);
        Ok(report)
    }

    /// Delete a report and its attachments. Notifications that mention it are kept.
    pub fn delete(&self, report_id: &str, actor: &Actor) -> Result<()> {
        let key = keys::report(report_id);
        let _guard = self.store.lock(&key)?;

        let report = self.load_visible(report_id, actor)?;
        self.check(actor, Action::Delete, &report)?;

        let mut batch = Batch::default();
        batch.remove(key.as_bytes());
        batch.remove(keys::week(&report.employee_id, report.week_start_date).as_bytes());
        let attachments = attachment::cascade(&self.store, report_id, &mut batch)?;
        self.store.apply(batch)?;

        tracing::info!(
            report = report_id,
            status = %report.status,
            attachments,
            "report deleted"
        );
        Ok(())
    }

    pub fn get(&self, report_id: &str, actor: &Actor) -> Result<Report> {
        self.load_visible(report_id, actor)
    }

    /// Reports visible to `actor`: employees see their own, reviewers see all.
    /// Newest week first.
    pub fn list(&self, actor: &Actor, query: &ReportQuery) -> Result<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .store
            .scan::<Report>(keys::REPORTS)?
            .into_iter()
            .filter(|report| policy::can_view(actor, report) && query.matches(report))
            .collect();
        reports.sort_by(|a, b| {
            b.week_start_date
                .cmp(&a.week_start_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(reports)
    }

    /// Reports whose week contains `today`. Supervisors and admins only.
    pub fn current_week(&self, actor: &Actor, today: NaiveDate) -> Result<Vec<Report>> {
        if !policy::can_view_current_week(actor) {
            return Err(Error::Unauthorized(
                "only supervisors and admins can list the current week".into(),
            ));
        }
        match week::week_start_containing(today) {
            Some(week_start) => self.list(actor, &ReportQuery::default().for_week(week_start)),
            None => Ok(Vec::new()),
        }
    }

    pub fn current_week_now(&self, actor: &Actor) -> Result<Vec<Report>> {
        self.current_week(actor, Utc::now().date_naive())
    }

    /// Serialized status change. Returns the new report and the status it left.
    fn transition(
        &self,
        report_id: &str,
        actor: &Actor,
        action: Action,
        feedback: Option<&str>,
    ) -> Result<(Report, ReportStatus)> {
        let key = keys::report(report_id);
        let _guard = self.store.lock(&key)?;

        let mut report = self.load_visible(report_id, actor)?;
        let from = report.status;
        let target = self.check(actor, action, &report)?.ok_or_else(|| {
            Error::Conflict(format!("{} does not produce a status", action.name()))
        })?;

        lifecycle::enter(&mut report, target, feedback.map(str::to_owned));
        self.store.save(&key, &report)?;

        tracing::info!(
            report = report_id,
            actor = actor.id(),
            action = action.name(),
            from = %from,
            to = %target,
            "report transitioned"
        );
        Ok((report, from))
    }

    /// Authorization first, then whether the current status still admits the
    /// action. A status mismatch means another request got there first.
    fn check(&self, actor: &Actor, action: Action, report: &Report) -> Result<Option<ReportStatus>> {
        if !policy::is_authorized(actor, action, report) {
            return Err(Error::Unauthorized(format!(
                "{} {} may not {} report {}",
                actor.role(),
                actor.id(),
                action.name(),
                report.id
            )));
        }
        policy::status_admits(actor, action, report.status)
            .map_err(|err| Error::Conflict(err.to_string()))
    }

    fn load_visible(&self, report_id: &str, actor: &Actor) -> Result<Report> {
        self.store
            .load::<Report>(&keys::report(report_id))?
            .filter(|report| policy::can_view(actor, report))
            .ok_or_else(|| Error::NotFound(format!("report {report_id}")))
    }

    // Best effort: the transition is already committed.
    fn notify(&self, sender: &Actor, recipient_id: &str, report: &Report, subject: &str, body: String) {
        let Some(messaging) = &self.notifier else {
            return;
        };
        if sender.id() == recipient_id {
            return;
        }
        let message = Message::new(recipient_id, subject, body).about_report(&report.id);
        if let Err(err) = messaging.send(sender, message) {
            tracing::warn!(
                report = %report.id,
                recipient = recipient_id,
                error = %err,
                "status notification not delivered"
            );
        }
    }
}

fn with_feedback(message: String, feedback: Option<&str>) -> String {
    match feedback.map(str::trim).filter(|f| !f.is_empty()) {
        Some(feedback) => format!("{message} with feedback: {feedback}"),
        None => message,
    }
}
