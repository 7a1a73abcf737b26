//! Stored calendar dates and the reference timezone they are read in.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

/// Civil timezone every stored date and reminder stamp is interpreted in.
pub const REFERENCE_TZ: Tz = chrono_tz::America::New_York;

/// `chrono` layout of the canonical `MM/DD/YYYY` form.
pub const CANONICAL_FORMAT: &str = "%m/%d/%Y";

/// Formats older clients wrote before dates were normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyFormat {
    /// `Mon Jan 2 2006`
    ShortDay,
    /// `Mon Jan 02 2006`
    PaddedDay,
}

impl LegacyFormat {
    /// Human-readable layout, used in log lines.
    pub fn layout(self) -> &'static str {
        match self {
            Self::ShortDay => "Mon Jan 2 2006",
            Self::PaddedDay => "Mon Jan 02 2006",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("no date recorded")]
    Missing,
    #[error("unrecognised date format: {0:?}")]
    Unrecognised(String),
}

/// A stored date string, classified once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDate {
    Empty,
    Canonical(NaiveDate),
    Legacy { date: NaiveDate, format: LegacyFormat },
    Unparseable(String),
}

impl ParsedDate {
    /// Classify `raw`: canonical first, then each legacy layout in order.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, CANONICAL_FORMAT) {
            return Self::Canonical(date);
        }
        match parse_legacy(trimmed) {
            Some((date, format)) => Self::Legacy { date, format },
            None => Self::Unparseable(raw.to_string()),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Canonical(date) | Self::Legacy { date, .. } => Some(*date),
            Self::Empty | Self::Unparseable(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }

    /// Canonical `MM/DD/YYYY` rendering, when the value holds a date.
    pub fn canonical(&self) -> Option<String> {
        self.date().map(format_canonical)
    }

    /// The date, or the reason there is none.
    pub fn into_date(self) -> Result<NaiveDate, DateParseError> {
        match self {
            Self::Canonical(date) | Self::Legacy { date, .. } => Ok(date),
            Self::Empty => Err(DateParseError::Missing),
            Self::Unparseable(raw) => Err(DateParseError::Unrecognised(raw)),
        }
    }
}

/// Legacy strings carry a weekday token that is checked for syntax only, the
/// way the original writer's parser treated it.
fn parse_legacy(raw: &str) -> Option<(NaiveDate, LegacyFormat)> {
    let mut parts = raw.split_whitespace();
    let weekday = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() || day.is_empty() || day.len() > 2 {
        return None;
    }
    weekday.parse::<Weekday>().ok()?;

    let date = NaiveDate::parse_from_str(&format!("{month} {day} {year}"), "%b %d %Y").ok()?;
    let format = if day.len() == 2 && day.starts_with('0') {
        LegacyFormat::PaddedDay
    } else {
        LegacyFormat::ShortDay
    };
    Some((date, format))
}

pub fn format_canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

/// Local midnight of `date` in `tz`.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// Calendar date of `now` as observed in `tz`.
pub fn civil_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}
