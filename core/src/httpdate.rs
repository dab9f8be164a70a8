//! HTTP date codec (`Fri, 01 Jan 2021 00:00:00 GMT`).
//!
//! # Design
//! `parse` never fails loudly: it returns `ParsedDate::Invalid` and leaves the
//! decision to the call site. The dispatcher treats an invalid conditional
//! date as absent, while `add_one_second` turns it into
//! `ApiError::InvalidHttpDate` because it cannot produce a result without a
//! real instant.
//!
//! A string is valid only in its canonical form, so formatting a parsed value
//! with the same `assume_gmt` flag always reproduces the input (modulo the
//! `UTC` zone token, which is accepted and normalized to `GMT`).

use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeDelta, Utc};

use crate::error::ApiError;

const STAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";
const GMT_TOKEN: &str = "GMT";
const ZONE_TOKENS: [&str; 2] = ["GMT", "UTC"];
const MAX_YEAR: i32 = 9999;

/// A parsed HTTP date, either pinned to GMT or zone-naive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpDate {
    Gmt(DateTime<Utc>),
    Naive(NaiveDateTime),
}

impl HttpDate {
    /// Wall-clock reading, ignoring any zone.
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            HttpDate::Gmt(dt) => dt.naive_utc(),
            HttpDate::Naive(naive) => *naive,
        }
    }

    fn checked_add(self, delta: TimeDelta) -> Option<HttpDate> {
        match self {
            HttpDate::Gmt(dt) => dt.checked_add_signed(delta).map(HttpDate::Gmt),
            HttpDate::Naive(naive) => naive.checked_add_signed(delta).map(HttpDate::Naive),
        }
    }
}

impl From<DateTime<Utc>> for HttpDate {
    fn from(dt: DateTime<Utc>) -> Self {
        HttpDate::Gmt(dt)
    }
}

impl From<NaiveDateTime> for HttpDate {
    fn from(naive: NaiveDateTime) -> Self {
        HttpDate::Naive(naive)
    }
}

/// Outcome of [`parse`]. Callers must pick soft-ignore or hard-fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Valid(HttpDate),
    Invalid,
}

impl ParsedDate {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedDate::Valid(_))
    }

    pub fn ok(self) -> Option<HttpDate> {
        match self {
            ParsedDate::Valid(date) => Some(date),
            ParsedDate::Invalid => None,
        }
    }
}

/// Parse an HTTP date. With `assume_gmt` the string must end in a `GMT` or
/// `UTC` token and the result is tagged GMT; otherwise it must carry no zone.
pub fn parse(text: &str, assume_gmt: bool) -> ParsedDate {
    let stamp = if assume_gmt {
        match text.rsplit_once(' ') {
            Some((stamp, zone)) if ZONE_TOKENS.contains(&zone) => stamp,
            _ => return ParsedDate::Invalid,
        }
    } else {
        text
    };

    // chrono also rejects a weekday that disagrees with the date.
    let Ok(naive) = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT) else {
        return ParsedDate::Invalid;
    };
    // Reject non-canonical spellings (`fri`, single-digit days, ...).
    if naive.format(STAMP_FORMAT).to_string() != stamp {
        return ParsedDate::Invalid;
    }

    if assume_gmt {
        ParsedDate::Valid(HttpDate::Gmt(naive.and_utc()))
    } else {
        ParsedDate::Valid(HttpDate::Naive(naive))
    }
}

/// Format a date. With `assume_gmt` the wall clock is re-tagged as GMT,
/// overwriting whatever zone the value had.
pub fn format(value: &HttpDate, assume_gmt: bool) -> String {
    let stamp = value.wall_clock().format(STAMP_FORMAT);
    if assume_gmt {
        format!("{stamp} {GMT_TOKEN}")
    } else {
        stamp.to_string()
    }
}

/// Return the HTTP date one second after `text`.
///
/// Used to build exclusive lower bounds for conditional queries. Fails when
/// the input is invalid or the result has no four-digit year.
pub fn add_one_second(text: &str, assume_gmt: bool) -> Result<String, ApiError> {
    let invalid = || ApiError::InvalidHttpDate(text.to_string());
    let date = parse(text, assume_gmt).ok().ok_or_else(invalid)?;
    let later = date.checked_add(TimeDelta::seconds(1)).ok_or_else(invalid)?;
    if later.wall_clock().year() > MAX_YEAR {
        return Err(invalid());
    }
    Ok(format(&later, assume_gmt))
}

/// The local clock as a zone-naive HTTP date.
pub fn now_naive() -> String {
    format(&HttpDate::Naive(Local::now().naive_local()), false)
}
