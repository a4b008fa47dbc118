//! Account status vocabulary and the policy that turns observed statuses into
//! reportable outcomes.
//!
//! Every place that needs to know whether an account is "restricted", or which
//! restriction bucket it belongs to, goes through [`AccountStatus::restriction_bucket`]
//! or [`Outcome::resolve`]. `Permanent Spamblock` and `Banned` share one bucket.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    Working,
    Frozen,
    #[serde(rename = "Temporary Spamblock")]
    TemporarySpamblock,
    #[serde(rename = "Permanent Spamblock")]
    PermanentSpamblock,
    Banned,
}

impl AccountStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Working => "Working",
            AccountStatus::Frozen => "Frozen",
            AccountStatus::TemporarySpamblock => "Temporary Spamblock",
            AccountStatus::PermanentSpamblock => "Permanent Spamblock",
            AccountStatus::Banned => "Banned",
        }
    }

    /// The restriction bucket this status counts toward, or `None` for `Working`.
    #[must_use]
    pub fn restriction_bucket(self) -> Option<RestrictionBucket> {
        match self {
            AccountStatus::Working => None,
            AccountStatus::Frozen => Some(RestrictionBucket::Frozen),
            AccountStatus::TemporarySpamblock => Some(RestrictionBucket::TemporarySpamblock),
            AccountStatus::PermanentSpamblock | AccountStatus::Banned => {
                Some(RestrictionBucket::PermanentOrBanned)
            }
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Working" => Ok(AccountStatus::Working),
            "Frozen" => Ok(AccountStatus::Frozen),
            "Temporary Spamblock" => Ok(AccountStatus::TemporarySpamblock),
            "Permanent Spamblock" => Ok(AccountStatus::PermanentSpamblock),
            "Banned" => Ok(AccountStatus::Banned),
            other => Err(CoreError::MalformedSnapshot {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Mutually exclusive non-`Working` terminal classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionBucket {
    Frozen,
    TemporarySpamblock,
    PermanentOrBanned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SnapshotType {
    #[serde(rename = "before")]
    Before,
    #[serde(rename = "after_immediate")]
    AfterImmediate,
    #[serde(rename = "after_day_2")]
    AfterDay2,
    #[serde(rename = "status_update")]
    StatusUpdate,
}

impl SnapshotType {
    pub const ALL: [SnapshotType; 4] = [
        SnapshotType::Before,
        SnapshotType::AfterImmediate,
        SnapshotType::AfterDay2,
        SnapshotType::StatusUpdate,
    ];

    /// Post-`before` types from most to least authoritative.
    pub const AFTER_PRIORITY: [SnapshotType; 3] = [
        SnapshotType::StatusUpdate,
        SnapshotType::AfterDay2,
        SnapshotType::AfterImmediate,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotType::Before => "before",
            SnapshotType::AfterImmediate => "after_immediate",
            SnapshotType::AfterDay2 => "after_day_2",
            SnapshotType::StatusUpdate => "status_update",
        }
    }

    #[must_use]
    pub fn is_post_campaign(self) -> bool {
        !matches!(self, SnapshotType::Before)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            SnapshotType::Before => 0,
            SnapshotType::AfterImmediate => 1,
            SnapshotType::AfterDay2 => 2,
            SnapshotType::StatusUpdate => 3,
        }
    }
}

impl fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SnapshotType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::MalformedSnapshot {
                field: "snapshot_type",
                value: s.to_string(),
            })
    }
}

/// How an eligible account's final state is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Final status `Working` and no temporary spamblock was observed.
    Healthy,
    /// Final status `Working` after passing through `Temporary Spamblock`.
    /// Not a restriction outcome.
    Resolved,
    Restricted(RestrictionBucket),
}

impl Outcome {
    /// Applies the status-transition policy to an effective final status.
    ///
    /// `passed_temporary_block` must be `true` when any post-`before` snapshot
    /// of the account reported `Temporary Spamblock`.
    #[must_use]
    pub fn resolve(status_after: AccountStatus, passed_temporary_block: bool) -> Self {
        match status_after.restriction_bucket() {
            Some(bucket) => Outcome::Restricted(bucket),
            None if passed_temporary_block => Outcome::Resolved,
            None => Outcome::Healthy,
        }
    }

    #[must_use]
    pub fn reported_status(self, status_after: AccountStatus) -> ReportedStatus {
        match self {
            Outcome::Resolved => ReportedStatus::TemporarySpamblockResolved,
            Outcome::Healthy | Outcome::Restricted(_) => ReportedStatus::Observed(status_after),
        }
    }
}

/// Status label shown for an account in a campaign report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportedStatus {
    Observed(AccountStatus),
    TemporarySpamblockResolved,
}

impl ReportedStatus {
    pub const RESOLVED_LABEL: &'static str = "Temporary Spamblock (Resolved)";

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportedStatus::Observed(status) => status.as_str(),
            ReportedStatus::TemporarySpamblockResolved => Self::RESOLVED_LABEL,
        }
    }

    /// Cross-campaign restriction predicate: anything other than `Working`
    /// or the resolved label.
    #[must_use]
    pub fn is_restricted(self) -> bool {
        match self {
            ReportedStatus::Observed(status) => status.restriction_bucket().is_some(),
            ReportedStatus::TemporarySpamblockResolved => false,
        }
    }
}

impl fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ReportedStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamblockKind {
    Permanent,
    Temporary,
}

/// Raw per-account signals read from an account state file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountTelemetry {
    pub spamblock: Option<SpamblockKind>,
    pub freeze_until: Option<String>,
    /// Set by the caller when the account file was found in a dead folder.
    pub dead: bool,
}

/// Maps raw telemetry to exactly one status label.
///
/// Precedence: dead flag, permanent spamblock, temporary spamblock, an
/// unexpired (or unparseable) freeze timestamp, otherwise `Working`.
#[must_use]
pub fn classify_status(telemetry: &AccountTelemetry, now: DateTime<Utc>) -> AccountStatus {
    if telemetry.dead {
        return AccountStatus::Banned;
    }
    match telemetry.spamblock {
        Some(SpamblockKind::Permanent) => return AccountStatus::PermanentSpamblock,
        Some(SpamblockKind::Temporary) => return AccountStatus::TemporarySpamblock,
        None => {}
    }
    match telemetry.freeze_until.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => match parse_utc_timestamp(raw) {
            Some(until) if until <= now => AccountStatus::Working,
            _ => AccountStatus::Frozen,
        },
        _ => AccountStatus::Working,
    }
}

/// Parses ISO-8601 timestamps; values without an offset are taken as UTC.
fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
