//! Weekly report records and the draft used to create or edit them
use chrono::{NaiveDate, Utc};

use crate::error::ValidationError;
use crate::types::{CalendarDate, TimeStamp};
use crate::week;

pub const MAX_HOURS_PER_WEEK: f64 = 168.0;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Submitted,
    #[n(2)]
    Approved,
    #[n(3)]
    Rejected,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        ReportStatus::Draft,
        ReportStatus::Submitted,
        ReportStatus::Approved,
        ReportStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Report {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub employee_id: String,
    #[n(2)]
    pub supervisor_id: Option<String>, // snapshot at creation
    #[n(3)]
    pub week_start_date: CalendarDate,
    #[n(4)]
    pub week_end_date: CalendarDate,
    #[n(5)]
    pub accomplished_tasks: String,
    #[n(6)]
    pub challenges_faced: Option<String>,
    #[n(7)]
    pub next_week_plans: Option<String>,
    #[n(8)]
    pub additional_comments: Option<String>,
    #[n(9)]
    pub hours_worked: Option<f64>,
    #[n(10)]
    pub status: ReportStatus,
    #[n(11)]
    pub created_at: TimeStamp<Utc>,
    #[n(12)]
    pub updated_at: TimeStamp<Utc>,
    #[n(13)]
    pub submitted_at: Option<TimeStamp<Utc>>,
    #[n(14)]
    pub approved_at: Option<TimeStamp<Utc>>,
    #[n(15)]
    pub rejected_at: Option<TimeStamp<Utc>>,
    #[n(16)]
    pub supervisor_feedback: Option<String>,
}

impl Report {
    pub(crate) fn apply_draft(&mut self, draft: ValidDraft) {
        self.week_start_date = draft.week_start.into();
        self.week_end_date = draft.week_end.into();
        self.accomplished_tasks = draft.fields.accomplished_tasks;
        self.challenges_faced = draft.fields.challenges_faced;
        self.next_week_plans = draft.fields.next_week_plans;
        self.additional_comments = draft.fields.additional_comments;
        self.hours_worked = draft.fields.hours_worked;
        self.updated_at = TimeStamp::new();
    }
}

/// Editable content of a report. Used both to create a report and to replace
/// the content of a draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDraft {
    week_start: Option<NaiveDate>,
    accomplished_tasks: String,
    challenges_faced: Option<String>,
    next_week_plans: Option<String>,
    additional_comments: Option<String>,
    hours_worked: Option<f64>,
}

/// A draft that passed validation, with its computed week end.
#[derive(Debug, Clone)]
pub(crate) struct ValidDraft {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    fields: ReportDraft,
}

impl ReportDraft {
    pub fn new(week_start: NaiveDate) -> Self {
        Self {
            week_start: Some(week_start),
            ..Self::default()
        }
    }
    pub fn set_accomplished_tasks(mut self, text: impl Into<String>) -> Self {
        self.accomplished_tasks = text.into();
        self
    }
    pub fn set_challenges_faced(mut self, text: impl Into<String>) -> Self {
        self.challenges_faced = Some(text.into());
        self
    }
    pub fn set_next_week_plans(mut self, text: impl Into<String>) -> Self {
        self.next_week_plans = Some(text.into());
        self
    }
    pub fn set_additional_comments(mut self, text: impl Into<String>) -> Self {
        self.additional_comments = Some(text.into());
        self
    }
    pub fn set_hours_worked(mut self, hours: f64) -> Self {
        self.hours_worked = Some(hours);
        self
    }

    // Checks fields and computes the week end.
    pub(crate) fn validate(self, min_task_chars: usize) -> Result<ValidDraft, ValidationError> {
        let week_start = self
            .week_start
            .ok_or(ValidationError::Blank("week_start_date"))?;
        let (week_start, week_end) = week::week_bounds(week_start)?;

        let found = self.accomplished_tasks.trim().chars().count();
        if found == 0 {
            return Err(ValidationError::Blank("accomplished_tasks"));
        }
        if found < min_task_chars {
            return Err(ValidationError::TasksTooShort {
                min: min_task_chars,
                found,
            });
        }
        if let Some(hours) = self.hours_worked {
            if !(0.0..=MAX_HOURS_PER_WEEK).contains(&hours) {
                return Err(ValidationError::HoursOutOfRange(hours));
            }
        }

        Ok(ValidDraft {
            week_start,
            week_end,
            fields: ReportDraft {
                challenges_faced: non_blank(self.challenges_faced),
                next_week_plans: non_blank(self.next_week_plans),
                additional_comments: non_blank(self.additional_comments),
                ..self
            },
        })
    }
}

impl ValidDraft {
    pub(crate) fn into_report(
        self,
        id: String,
        employee_id: String,
        supervisor_id: Option<String>,
    ) -> Report {
        let now = TimeStamp::new();
        let mut report = Report {
            id,
            employee_id,
            supervisor_id,
            week_start_date: self.week_start.into(),
            week_end_date: self.week_end.into(),
            accomplished_tasks: String::new(),
            challenges_faced: None,
            next_week_plans: None,
            additional_comments: None,
            hours_worked: None,
            status: ReportStatus::Draft,
            created_at: now.clone(),
            updated_at: now,
            submitted_at: None,
            approved_at: None,
            rejected_at: None,
            supervisor_feedback: None,
        };
        report.apply_draft(self);
        report
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 7).unwrap()
    }

    #[test]
    fn valid_draft_computes_week_end() {
        let draft = ReportDraft::new(friday())
            .set_accomplished_tasks("Closed the quarterly audit")
            .set_challenges_faced("   ")
            .set_hours_worked(40.0)
            .validate(10)
            .unwrap();

        assert_eq!(draft.week_end, NaiveDate::from_ymd_opt(2024, 6, 13).unwrap());

        let report = draft.into_report("report_x".into(), "user_e".into(), None);
        assert_eq!(report.status, ReportStatus::Draft);
        assert_eq!(report.challenges_faced, None);
        assert_eq!(report.hours_worked, Some(40.0));
    }

    #[test]
    fn short_tasks_are_rejected() {
        let err = ReportDraft::new(friday())
            .set_accomplished_tasks("too short")
            .validate(10)
            .unwrap_err();
        assert_eq!(err, ValidationError::TasksTooShort { min: 10, found: 9 });
    }

    #[test]
    fn hours_beyond_a_week_are_rejected() {
        let err = ReportDraft::new(friday())
            .set_accomplished_tasks("Closed the quarterly audit")
            .set_hours_worked(169.0)
            .validate(10)
            .unwrap_err();
        assert_eq!(err.field(), "hours_worked");
    }

    #[test]
    fn report_encoding() {
        let report = ReportDraft::new(friday())
            .set_accomplished_tasks("Closed the quarterly audit")
            .validate(10)
            .unwrap()
            .into_report("report_x".into(), "user_e".into(), Some("user_s".into()));

        let encoding = minicbor::to_vec(&report).unwrap();
        let decode: Report = minicbor::decode(&encoding).unwrap();

        assert_eq!(report, decode);
    }
}
