use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountStatus, CoreError, SnapshotType};

/// One immutable snapshot-log row.
///
/// `message_count` and `invite_count` are cumulative-to-date counters for the
/// account at the time of the snapshot, not deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub campaign_id: i64,
    pub phone: String,
    pub snapshot_type: SnapshotType,
    pub message_count: i64,
    pub invite_count: i64,
    pub status: AccountStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Per-unit revenue coefficients of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCosts {
    pub cost_per_message: Decimal,
    pub cost_per_invite: Decimal,
}

impl CampaignCosts {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCampaign`] if either coefficient is negative.
    pub fn new(cost_per_message: Decimal, cost_per_invite: Decimal) -> Result<Self, CoreError> {
        if cost_per_message < Decimal::ZERO {
            return Err(CoreError::InvalidCampaign(
                "cost_per_message must not be negative".to_string(),
            ));
        }
        if cost_per_invite < Decimal::ZERO {
            return Err(CoreError::InvalidCampaign(
                "cost_per_invite must not be negative".to_string(),
            ));
        }
        Ok(Self {
            cost_per_message,
            cost_per_invite,
        })
    }

    /// `messages * cost_per_message + invites * cost_per_invite`.
    #[must_use]
    pub fn revenue(&self, messages: i64, invites: i64) -> Decimal {
        Decimal::from(messages) * self.cost_per_message
            + Decimal::from(invites) * self.cost_per_invite
    }
}
