use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CampaignCosts, CoreError};

/// Client code of a campaign: the part of its name before the first `_`.
///
/// A name without `_` is its own client code.
#[must_use]
pub fn client_code(campaign_name: &str) -> &str {
    campaign_name
        .split_once('_')
        .map_or(campaign_name, |(code, _)| code)
}

/// Campaign master data as submitted for create or edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub cost_per_message: Decimal,
    pub cost_per_invite: Decimal,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub base_type: Option<String>,
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub offer: Option<String>,
}

impl NewCampaign {
    /// Trims the name and tag fields and checks the costs.
    ///
    /// Blank tags become `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCampaign`] for a blank name or a negative cost.
    pub fn validate(mut self) -> Result<Self, CoreError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(CoreError::InvalidCampaign(
                "name must not be empty".to_string(),
            ));
        }
        self.costs()?;
        for tag in [
            &mut self.message_type,
            &mut self.base_type,
            &mut self.link_type,
            &mut self.offer,
        ] {
            *tag = tag
                .take()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCampaign`] if either cost is negative.
    pub fn costs(&self) -> Result<CampaignCosts, CoreError> {
        CampaignCosts::new(self.cost_per_message, self.cost_per_invite)
    }
}
