//! Data Models Module
//!
//! Typed representation of a DMARC aggregate report (`<feedback>` document).
//! Every field is optional in the source document and falls back to its zero
//! value when absent, except `pct`, whose absence is kept distinct from `0`.
//! Policy strings (`adkim`, `p`, `disposition`, ...) stay opaque strings: the
//! checks in [`Record`] compare them literally.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::timestamp;

/// Root of a report, the `<feedback>` element.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename = "feedback", default)]
pub struct Aggregate {
    #[serde(rename = "report_metadata")]
    pub metadata: Metadata,
    pub policy_published: PolicyPublished,
    #[serde(rename = "record")]
    pub records: Vec<Record>,
}

impl Aggregate {
    /// Total number of messages covered by the report.
    pub fn message_count(&self) -> u64 {
        self.records.iter().map(|r| r.row.count).sum()
    }
}

/// `feedback>report_metadata`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Metadata {
    pub org_name: String,
    pub email: String,
    pub extra_contact_info: String,
    pub report_id: String,
    pub date_range: DateRange,
}

/// `feedback>report_metadata>date_range`, both bounds inclusive.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DateRange {
    #[serde(deserialize_with = "timestamp::begin")]
    pub begin: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::end")]
    pub end: DateTime<Utc>,
}

/// `feedback>policy_published`, the policy the domain owner declared.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PolicyPublished {
    pub domain: String,
    pub adkim: String,
    pub aspf: String,
    #[serde(rename = "p")]
    pub policy: String,
    #[serde(rename = "sp")]
    pub subdomain_policy: String,
    /// `None` when `<pct>` is missing from the document; an empty `<pct/>` is `Some(0)`.
    #[serde(rename = "pct", deserialize_with = "some_integer")]
    pub percentage: Option<u32>,
}

/// `feedback>record`, the traffic seen from one source IP.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Record {
    pub row: Row,
    pub identifiers: Identifiers,
    pub auth_results: AuthResults,
}

impl Record {
    /// True when the receiver took no action on the messages (`disposition`
    /// is `none`). The published `p`, `sp` and `pct` are not consulted, so a
    /// sampled `quarantine` still counts as a failure.
    pub fn final_disposition_success(&self) -> bool {
        self.row.policy_evaluated.disposition == "none"
    }

    /// True when the RFC5322.From domain matched the DKIM `d=` domain.
    pub fn dkim_aligned(&self) -> bool {
        self.row.policy_evaluated.dkim == "pass"
    }

    /// True when the RFC5322.From domain matched the RFC5321.MailFrom domain.
    pub fn spf_aligned(&self) -> bool {
        self.row.policy_evaluated.spf == "pass"
    }

    /// True when the DKIM signature verified.
    pub fn dkim_success(&self) -> bool {
        self.auth_results.dkim.result == "pass"
    }

    /// True when the SPF check passed.
    pub fn spf_success(&self) -> bool {
        self.auth_results.spf.result == "pass"
    }
}

/// `feedback>record>row`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Row {
    pub source_ip: String,
    #[serde(deserialize_with = "integer")]
    pub count: u64,
    pub policy_evaluated: PolicyEvaluated,
}

/// `feedback>record>row>policy_evaluated`, the receiver's verdict.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PolicyEvaluated {
    pub disposition: String,
    pub dkim: String,
    pub spf: String,
}

/// `feedback>record>identifiers`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Identifiers {
    pub header_from: String,
}

/// `feedback>record>auth_results`, the raw protocol outcomes.
///
/// Receivers may list several `<dkim>` or `<spf>` results, adjacent or
/// interleaved with each other; the last one of each kind is kept.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AuthResults {
    #[serde(deserialize_with = "last_of")]
    pub dkim: DkimAuthResult,
    #[serde(deserialize_with = "last_of")]
    pub spf: SpfAuthResult,
}

/// `feedback>record>auth_results>dkim`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DkimAuthResult {
    pub domain: String,
    pub result: String,
    pub selector: String,
}

/// `feedback>record>auth_results>spf`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SpfAuthResult {
    pub domain: String,
    pub result: String,
    pub scope: String,
}

/// Reads element text as an integer; empty text is zero.
fn integer<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    let text = raw.trim();
    if text.is_empty() {
        return Ok(T::default());
    }
    text.parse()
        .map_err(|e| D::Error::custom(format!("invalid integer {raw:?}: {e}")))
}

fn some_integer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    integer(deserializer).map(Some)
}

fn last_of<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let mut items = Vec::<T>::deserialize(deserializer)?;
    Ok(items.pop().unwrap_or_default())
}
