//! Time formats used inside statements.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::{Error, Result};

/// RFC 1123 as produced by `Date.prototype.toUTCString`, e.g.
/// `Thu, 11 Jan 2024 20:34:02 GMT`.
const UTC_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// [`UTC_FORMAT`] without the weekday.
const UTC_FORMAT_DATE: &str = "%d %b %Y %H:%M:%S GMT";

/// Birth dates, e.g. `02 Feb 1992`.
const BIRTH_DATE_FORMAT: &str = "%d %b %Y";

pub fn format_time(t: DateTime<Utc>) -> String { t.format(UTC_FORMAT).to_string() }

/// Parse a [`UTC_FORMAT`] time. The weekday is redundant and not checked
/// against the date.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>> {
  let date = s.split_once(", ").map_or(s, |(_, rest)| rest);
  NaiveDateTime::parse_from_str(date, UTC_FORMAT_DATE)
    .map(|t| t.and_utc())
    .map_err(|_| Error::InvalidTime(s.to_owned()))
}

pub fn format_birth_date(d: NaiveDate) -> String { d.format(BIRTH_DATE_FORMAT).to_string() }

pub fn parse_birth_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, BIRTH_DATE_FORMAT).map_err(|_| Error::InvalidValue {
    field: "Date of birth",
    value: s.to_owned(),
  })
}
