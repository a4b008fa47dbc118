//! Pure domain logic for campaign performance tracking.
//!
//! Nothing in this crate performs I/O. The database and HTTP crates feed
//! snapshot rows in and render the computed reports out.

mod aggregate;
mod app_config;
mod campaign;
mod config;
mod period;
mod snapshot;
mod stats;
mod status;
mod warmup;

use thiserror::Error;

pub use aggregate::{
    aggregate_reports, AggregateReport, AggregateSummary, CampaignBreakdown, CampaignFold,
    CampaignRef,
};
pub use app_config::{AppConfig, ClientConfig, Environment};
pub use campaign::{client_code, NewCampaign};
pub use config::{load_app_config, load_app_config_from_env, load_client_config};
pub use period::{select_range, DateRange, ReportPeriod};
pub use snapshot::{CampaignCosts, SnapshotRecord};
pub use stats::{
    compute_campaign_stats, AccountResult, BucketTally, CampaignReport, CampaignSummary,
};
pub use status::{
    classify_status, AccountStatus, AccountTelemetry, Outcome, ReportedStatus,
    RestrictionBucket, SnapshotType, SpamblockKind,
};
pub use warmup::{warmup_report, WarmupAccount, WarmupBracket, WarmupBracketStats};

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("malformed snapshot: unknown {field} \"{value}\"")]
    MalformedSnapshot { field: &'static str, value: String },
    #[error("invalid campaign: {0}")]
    InvalidCampaign(String),
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("date range is missing {0}")]
    IncompleteDateRange(&'static str),
    #[error("invalid report period \"{0}\"")]
    InvalidPeriod(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
