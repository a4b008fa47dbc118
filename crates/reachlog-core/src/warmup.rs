//! Warmup bracket report: how long an account rested between registration and
//! its first campaign, against its lifetime results.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::stats::{safe_decimal_ratio, safe_ratio};
use crate::{AccountStatus, RestrictionBucket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WarmupBracket {
    UpToWeek,
    UpToTwoWeeks,
    UpToMonth,
    UpToTwoMonths,
    Longer,
    Unknown,
}

impl WarmupBracket {
    pub const ALL: [WarmupBracket; 6] = [
        WarmupBracket::UpToWeek,
        WarmupBracket::UpToTwoWeeks,
        WarmupBracket::UpToMonth,
        WarmupBracket::UpToTwoMonths,
        WarmupBracket::Longer,
        WarmupBracket::Unknown,
    ];

    /// Bracket for a rest period, `None` when the days are negative.
    #[must_use]
    pub fn for_rest_days(rest_days: Option<i64>) -> Option<Self> {
        let Some(days) = rest_days else {
            return Some(Self::Unknown);
        };
        match days {
            i64::MIN..=-1 => None,
            0..=7 => Some(Self::UpToWeek),
            8..=14 => Some(Self::UpToTwoWeeks),
            15..=30 => Some(Self::UpToMonth),
            31..=60 => Some(Self::UpToTwoMonths),
            _ => Some(Self::Longer),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            WarmupBracket::UpToWeek => "0 - 7",
            WarmupBracket::UpToTwoWeeks => "08 - 14",
            WarmupBracket::UpToMonth => "15 - 30",
            WarmupBracket::UpToTwoMonths => "31 - 60",
            WarmupBracket::Longer => "61+",
            WarmupBracket::Unknown => "N/A",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Serialize for WarmupBracket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Lifetime view of one account that has been through at least one campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmupAccount {
    pub phone: String,
    pub registration_date: Option<NaiveDate>,
    pub first_campaign_date: NaiveDate,
    pub total_revenue: Decimal,
    pub total_messages: i64,
    pub current_status: AccountStatus,
}

impl WarmupAccount {
    #[must_use]
    pub fn rest_days(&self) -> Option<i64> {
        self.registration_date
            .map(|registered| (self.first_campaign_date - registered).num_days())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmupBracketStats {
    pub bracket: WarmupBracket,
    pub account_count: u64,
    pub avg_ltv: Decimal,
    pub avg_messages: f64,
    pub percent_working: f64,
    pub percent_perm_spam: f64,
    pub percent_frozen: f64,
}

#[derive(Default)]
struct Tally {
    count: u64,
    revenue: Decimal,
    messages: i64,
    working: u64,
    perm_spam: u64,
    frozen: u64,
}

impl Tally {
    fn record(&mut self, account: &WarmupAccount) {
        self.count += 1;
        self.revenue += account.total_revenue;
        self.messages += account.total_messages;
        match account.current_status.restriction_bucket() {
            None => self.working += 1,
            Some(RestrictionBucket::PermanentOrBanned) => self.perm_spam += 1,
            Some(RestrictionBucket::Frozen) => self.frozen += 1,
            Some(RestrictionBucket::TemporarySpamblock) => {}
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&self, bracket: WarmupBracket) -> WarmupBracketStats {
        let percent = |n: u64| safe_ratio(n as f64, self.count) * 100.0;
        WarmupBracketStats {
            bracket,
            account_count: self.count,
            avg_ltv: safe_decimal_ratio(self.revenue, self.count),
            avg_messages: safe_ratio(self.messages as f64, self.count),
            percent_working: percent(self.working),
            percent_perm_spam: percent(self.perm_spam),
            percent_frozen: percent(self.frozen),
        }
    }
}

/// Buckets accounts by rest days. Empty brackets are left out and the rest
/// come back in [`WarmupBracket::ALL`] order.
#[must_use]
pub fn warmup_report(accounts: &[WarmupAccount]) -> Vec<WarmupBracketStats> {
    let mut tallies: [Tally; 6] = Default::default();

    for account in accounts {
        match WarmupBracket::for_rest_days(account.rest_days()) {
            Some(bracket) => tallies[bracket.index()].record(account),
            None => tracing::debug!(
                phone = %account.phone,
                "registration date after first campaign; skipping"
            ),
        }
    }

    WarmupBracket::ALL
        .into_iter()
        .filter(|b| tallies[b.index()].count > 0)
        .map(|b| tallies[b.index()].finish(b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn account(
        phone: &str,
        registered: Option<NaiveDate>,
        revenue: i64,
        messages: i64,
        status: AccountStatus,
    ) -> WarmupAccount {
        WarmupAccount {
            phone: phone.to_string(),
            registration_date: registered,
            first_campaign_date: date(31),
            total_revenue: Decimal::from(revenue),
            total_messages: messages,
            current_status: status,
        }
    }

    #[test]
    fn bracket_boundaries() {
        assert_eq!(WarmupBracket::for_rest_days(Some(0)), Some(WarmupBracket::UpToWeek));
        assert_eq!(WarmupBracket::for_rest_days(Some(7)), Some(WarmupBracket::UpToWeek));
        assert_eq!(
            WarmupBracket::for_rest_days(Some(8)),
            Some(WarmupBracket::UpToTwoWeeks)
        );
        assert_eq!(
            WarmupBracket::for_rest_days(Some(30)),
            Some(WarmupBracket::UpToMonth)
        );
        assert_eq!(
            WarmupBracket::for_rest_days(Some(60)),
            Some(WarmupBracket::UpToTwoMonths)
        );
        assert_eq!(WarmupBracket::for_rest_days(Some(61)), Some(WarmupBracket::Longer));
        assert_eq!(WarmupBracket::for_rest_days(None), Some(WarmupBracket::Unknown));
        assert_eq!(WarmupBracket::for_rest_days(Some(-1)), None);
    }

    #[test]
    fn brackets_serialize_as_labels() {
        let json = serde_json::to_string(&WarmupBracket::UpToTwoWeeks).unwrap();
        assert_eq!(json, "\"08 - 14\"");
    }

    #[test]
    fn report_groups_and_averages() {
        let accounts = vec![
            account("+1", Some(date(28)), 100, 40, AccountStatus::Working),
            account("+2", Some(date(25)), 300, 60, AccountStatus::Banned),
            account("+3", Some(date(1)), 10, 5, AccountStatus::Frozen),
        ];
        let report = warmup_report(&accounts);

        assert_eq!(report.len(), 2);
        let week = &report[0];
        assert_eq!(week.bracket, WarmupBracket::UpToWeek);
        assert_eq!(week.account_count, 2);
        assert_eq!(week.avg_ltv, Decimal::from(200));
        assert!((week.avg_messages - 50.0).abs() < f64::EPSILON);
        assert!((week.percent_working - 50.0).abs() < f64::EPSILON);
        assert!((week.percent_perm_spam - 50.0).abs() < f64::EPSILON);
        assert!(week.percent_frozen.abs() < f64::EPSILON);

        let month = &report[1];
        assert_eq!(month.bracket, WarmupBracket::UpToMonth);
        assert!((month.percent_frozen - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn permanent_spamblock_and_banned_share_a_bucket() {
        let accounts = vec![
            account("+1", Some(date(30)), 0, 0, AccountStatus::PermanentSpamblock),
            account("+2", Some(date(30)), 0, 0, AccountStatus::Banned),
        ];
        let report = warmup_report(&accounts);
        assert!((report[0].percent_perm_spam - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn temporary_spamblock_counts_without_its_own_percentage() {
        let accounts = vec![
            account("+1", Some(date(30)), 0, 0, AccountStatus::TemporarySpamblock),
            account("+2", Some(date(30)), 0, 0, AccountStatus::Working),
        ];
        let report = warmup_report(&accounts);
        assert_eq!(report[0].account_count, 2);
        assert!((report[0].percent_working - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_registration_goes_last_and_negative_rest_is_skipped() {
        let mut late = account("+late", Some(date(31)), 0, 0, AccountStatus::Working);
        late.first_campaign_date = date(2);
        let accounts = vec![
            account("+na", None, 5, 5, AccountStatus::Working),
            late,
            account(
                "+old",
                Some(date(1) - chrono::Duration::days(90)),
                0,
                0,
                AccountStatus::Working,
            ),
        ];
        let report = warmup_report(&accounts);
        let labels: Vec<&str> = report.iter().map(|s| s.bracket.label()).collect();
        assert_eq!(labels, vec!["61+", "N/A"]);
    }

    #[test]
    fn empty_input_gives_empty_report() {
        assert!(warmup_report(&[]).is_empty());
    }
}
