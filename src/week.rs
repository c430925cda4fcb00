//! Report weeks run Friday through Thursday.
use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::ValidationError;

pub const WEEK_ANCHOR: Weekday = Weekday::Fri;
const WEEK_SPAN: Days = Days::new(6);

pub fn is_week_anchor(date: NaiveDate) -> bool {
    date.weekday() == WEEK_ANCHOR
}

/// Validates the anchor weekday and returns the inclusive week end.
pub fn week_bounds(start: NaiveDate) -> Result<(NaiveDate, NaiveDate), ValidationError> {
    if !is_week_anchor(start) {
        return Err(ValidationError::NotWeekAnchor(start));
    }
    let end = start
        .checked_add_days(WEEK_SPAN)
        .ok_or(ValidationError::WeekOutOfRange(start))?;

    Ok((start, end))
}

/// The Friday on or before `date`.
pub fn week_start_containing(date: NaiveDate) -> Option<NaiveDate> {
    let back = (date.weekday().num_days_from_monday() + 7 - WEEK_ANCHOR.num_days_from_monday()) % 7;
    date.checked_sub_days(Days::new(back as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn friday_start_spans_seven_days() {
        let (start, end) = week_bounds(day(2024, 6, 7)).unwrap();
        assert_eq!(start, day(2024, 6, 7));
        assert_eq!(end, day(2024, 6, 13));
    }

    #[test]
    fn thursday_start_is_rejected() {
        assert_eq!(
            week_bounds(day(2024, 6, 6)),
            Err(ValidationError::NotWeekAnchor(day(2024, 6, 6)))
        );
    }

    #[test]
    fn start_containing_walks_back_to_friday() {
        assert_eq!(week_start_containing(day(2024, 6, 7)), Some(day(2024, 6, 7)));
        assert_eq!(week_start_containing(day(2024, 6, 13)), Some(day(2024, 6, 7)));
        assert_eq!(week_start_containing(day(2024, 6, 10)), Some(day(2024, 6, 7)));
        assert_eq!(week_start_containing(day(2024, 6, 14)), Some(day(2024, 6, 14)));
    }
}
