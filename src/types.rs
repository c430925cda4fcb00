//! Timestamp and calendar date newtypes with their CBOR encodings
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

// Utc is not Ord, so ordering is defined on the instant.
impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

// A day without a time of day, used for report weeks.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(value: NaiveDate) -> Self {
        CalendarDate(value)
    }
}

impl std::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

impl<C> minicbor::Encode<C> for CalendarDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(self.0.num_days_from_ce())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for CalendarDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days)
            .map(CalendarDate)
            .ok_or(minicbor::decode::Error::message(
                "failed to convert day count to a calendar date",
            ))
    }
}
