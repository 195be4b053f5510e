//! Unix timestamp fields.
//!
//! `date_range/begin` and `date_range/end` carry bare epoch seconds. These
//! hooks are wired into the model with `#[serde(deserialize_with = ...)]`, so
//! the conversion to `DateTime<Utc>` happens while the document is decoded.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Prefix of the deserializer message raised for an unparsable timestamp.
/// `DmarcError` recognises it and turns it into `MalformedField`.
const MALFORMED: &str = "malformed field ";

pub(crate) const BEGIN: &str = "feedback/report_metadata/date_range/begin";
pub(crate) const END: &str = "feedback/report_metadata/date_range/end";

pub(crate) fn begin<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    epoch_seconds(deserializer, BEGIN)
}

pub(crate) fn end<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    epoch_seconds(deserializer, END)
}

fn epoch_seconds<'de, D>(deserializer: D, field: &'static str) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| D::Error::custom(format!("{MALFORMED}{field}: {raw}")))
}

/// Parses epoch seconds into a UTC instant. Surrounding whitespace is allowed.
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let secs = raw.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(secs, 0)
}

/// Splits a message produced by [`epoch_seconds`] back into `(field, value)`.
pub(crate) fn malformed_field(message: &str) -> Option<(&str, &str)> {
    message.strip_prefix(MALFORMED)?.split_once(": ")
}
