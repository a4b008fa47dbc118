//! Local record of which accounts took part in which campaign.
//!
//! Stored as a JSON file next to the account folders. "The last campaign" is
//! always a lookup on this file, never process state.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to access roster {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("roster {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub scan_date: NaiveDate,
    pub phones: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    campaigns: BTreeMap<String, RosterEntry>,
}

impl Roster {
    /// Loads the roster, treating a missing file as empty.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(RosterError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| RosterError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the roster through a temporary sibling file and a rename.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), RosterError> {
        let io_err = |source: std::io::Error| RosterError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|source| RosterError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)
    }

    /// Replaces the membership of `campaign`.
    pub fn record<I>(&mut self, campaign: &str, scan_date: NaiveDate, phones: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.campaigns.insert(
            campaign.to_string(),
            RosterEntry {
                scan_date,
                phones: phones.into_iter().collect(),
            },
        );
    }

    /// Adds `phones` to an existing campaign. Returns how many were new.
    pub fn append<I>(&mut self, campaign: &str, phones: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let Some(entry) = self.campaigns.get_mut(campaign) else {
            return 0;
        };
        phones
            .into_iter()
            .filter(|phone| entry.phones.insert(phone.clone()))
            .count()
    }

    #[must_use]
    pub fn entry(&self, campaign: &str) -> Option<&RosterEntry> {
        self.campaigns.get(campaign)
    }

    /// Campaign with the latest scan date. Ties go to the name that sorts last.
    #[must_use]
    pub fn most_recent_campaign(&self) -> Option<&str> {
        self.campaigns
            .iter()
            .max_by_key(|(name, entry)| (entry.scan_date, *name))
            .map(|(name, _)| name.as_str())
    }

    /// Most recent campaign containing `phone`, with the same tie rule.
    #[must_use]
    pub fn last_campaign_for(&self, phone: &str) -> Option<&str> {
        self.campaigns
            .iter()
            .filter(|(_, entry)| entry.phones.contains(phone))
            .max_by_key(|(name, entry)| (entry.scan_date, *name))
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    fn phones(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn most_recent_campaign_uses_scan_date() {
        let mut roster = Roster::default();
        assert_eq!(roster.most_recent_campaign(), None);

        roster.record("acme_b", d(2), phones(&["1"]));
        roster.record("acme_a", d(5), phones(&["1"]));
        roster.record("acme_c", d(5), phones(&["2"]));
        assert_eq!(roster.most_recent_campaign(), Some("acme_c"));
    }

    #[test]
    fn last_campaign_for_only_considers_campaigns_with_the_phone() {
        let mut roster = Roster::default();
        roster.record("acme_april", d(1), phones(&["1", "2"]));
        roster.record("acme_may", d(20), phones(&["2"]));

        assert_eq!(roster.last_campaign_for("1"), Some("acme_april"));
        assert_eq!(roster.last_campaign_for("2"), Some("acme_may"));
        assert_eq!(roster.last_campaign_for("3"), None);
    }

    #[test]
    fn append_reports_only_new_members() {
        let mut roster = Roster::default();
        roster.record("acme_april", d(1), phones(&["1"]));

        assert_eq!(roster.append("acme_april", phones(&["1", "9"])), 1);
        assert_eq!(roster.append("unknown", phones(&["9"])), 0);
        let entry = roster.entry("acme_april").unwrap();
        assert!(entry.phones.contains("9"));
        assert_eq!(entry.scan_date, d(1));
    }

    #[test]
    fn record_replaces_previous_membership() {
        let mut roster = Roster::default();
        roster.record("acme_april", d(1), phones(&["1", "2"]));
        roster.record("acme_april", d(3), phones(&["3"]));

        let entry = roster.entry("acme_april").unwrap();
        assert_eq!(entry.scan_date, d(3));
        assert_eq!(entry.phones.len(), 1);
    }

    #[test]
    fn load_missing_file_is_empty_and_save_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state").join("roster.json");
        assert_eq!(Roster::load(&path).unwrap(), Roster::default());

        let mut roster = Roster::default();
        roster.record("acme_april", d(1), phones(&["1"]));
        roster.save(&path).unwrap();

        assert_eq!(Roster::load(&path).unwrap(), roster);
    }

    #[test]
    fn load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("roster.json");
        std::fs::write(&path, "[oops").unwrap();
        assert!(matches!(Roster::load(&path), Err(RosterError::Json { .. })));
    }
}
