//! Reads per-account JSON state files from disk.
//!
//! Each account lives in `<phone>.json`. A file that cannot be read or parsed
//! is skipped with a warning so one corrupt account never aborts a scan.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use reachlog_core::{classify_status, AccountStatus, AccountTelemetry, SpamblockKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot derive a phone number from {0}")]
    InvalidFileName(PathBuf),
}

/// One account as submitted to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedAccount {
    pub phone: String,
    pub registration_date: Option<NaiveDate>,
    pub status: AccountStatus,
    pub messages_sent: i64,
    pub invites_sent: i64,
}

#[derive(Debug, Default, Deserialize)]
struct AccountFile {
    #[serde(default)]
    spamblock: Option<serde_json::Value>,
    #[serde(default)]
    freeze_until: Option<serde_json::Value>,
    #[serde(default)]
    stats_spam_count: Option<i64>,
    #[serde(default)]
    stats_invites_count: Option<i64>,
    #[serde(default)]
    register_time: Option<serde_json::Value>,
    #[serde(default)]
    session_created_date: Option<serde_json::Value>,
}

impl AccountFile {
    fn telemetry(&self, dead: bool) -> AccountTelemetry {
        let spamblock = match self.spamblock.as_ref().and_then(serde_json::Value::as_str) {
            Some("permanent") => Some(SpamblockKind::Permanent),
            Some("temporary") => Some(SpamblockKind::Temporary),
            _ => None,
        };
        // A non-string freeze marker cannot be parsed and therefore reads as frozen.
        let freeze_until = match &self.freeze_until {
            None | Some(serde_json::Value::Null | serde_json::Value::Bool(false)) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        AccountTelemetry {
            spamblock,
            freeze_until,
            dead,
        }
    }

    /// `register_time` (epoch seconds) wins; otherwise the date prefix of
    /// `session_created_date`.
    fn registration_date(&self) -> Option<NaiveDate> {
        let from_epoch = self
            .register_time
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| {
                #[allow(clippy::cast_possible_truncation)]
                let secs = secs as i64;
                DateTime::from_timestamp(secs, 0)
            })
            .map(|dt| dt.date_naive());

        from_epoch.or_else(|| {
            self.session_created_date
                .as_ref()
                .and_then(serde_json::Value::as_str)
                .and_then(|raw| raw.get(..10))
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
    }
}

/// Phone number encoded in an account file name: everything before the first `.`.
fn phone_from_path(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
        .map(ToOwned::to_owned)
}

/// Parses account file contents. `dead` marks files found in a dead folder.
///
/// # Errors
///
/// Returns [`ScanError::Parse`] if `contents` is not a JSON object of the
/// expected shape.
pub fn parse_account(
    path: &Path,
    phone: String,
    contents: &str,
    dead: bool,
    now: DateTime<Utc>,
) -> Result<ScannedAccount, ScanError> {
    let file: AccountFile = serde_json::from_str(contents).map_err(|source| ScanError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(ScannedAccount {
        status: classify_status(&file.telemetry(dead), now),
        registration_date: file.registration_date(),
        messages_sent: file.stats_spam_count.unwrap_or(0),
        invites_sent: file.stats_invites_count.unwrap_or(0),
        phone,
    })
}

/// # Errors
///
/// Returns [`ScanError`] if the file cannot be read, parsed, or named.
pub fn read_account_file(
    path: &Path,
    dead: bool,
    now: DateTime<Utc>,
) -> Result<ScannedAccount, ScanError> {
    let phone = phone_from_path(path).ok_or_else(|| ScanError::InvalidFileName(path.into()))?;
    let contents = fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_account(path, phone, &contents, dead, now)
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// `.json` files directly inside `dir`, sorted. A missing directory yields
/// nothing.
#[must_use]
pub fn json_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let files: BTreeSet<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_json(path))
        .collect();
    files.into_iter().collect()
}

/// `.json` files anywhere under `root`, sorted.
#[must_use]
pub fn json_files_recursive(root: &Path) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_json(&path) {
                found.insert(path);
            }
        }
    }

    found.into_iter().collect()
}

/// Whether `path` lies inside `folder`, comparing absolute forms.
#[must_use]
pub fn is_inside(path: &Path, folder: &Path) -> bool {
    match (std::path::absolute(path), std::path::absolute(folder)) {
        (Ok(path), Ok(folder)) => path.starts_with(folder),
        _ => false,
    }
}

/// Reads `files`, skipping the unreadable ones. `dead` decides per file.
pub fn read_files<F>(files: &[PathBuf], dead: F, now: DateTime<Utc>) -> Vec<ScannedAccount>
where
    F: Fn(&Path) -> bool,
{
    files
        .iter()
        .filter_map(|path| match read_account_file(path, dead(path), now) {
            Ok(account) => Some(account),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable account file");
                None
            }
        })
        .collect()
}

/// Reads every account file directly inside `dir`.
#[must_use]
pub fn scan_folder(dir: &Path, dead: bool, now: DateTime<Utc>) -> Vec<ScannedAccount> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "account folder not found");
        return Vec::new();
    }
    read_files(&json_files(dir), |_| dead, now)
}

#[cfg(test)]
#[path = "scanner_test.rs"]
mod tests;
