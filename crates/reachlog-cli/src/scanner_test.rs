use super::*;
use chrono::TimeZone;
use std::fs;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

fn parse(contents: &str, dead: bool) -> ScannedAccount {
    parse_account(
        Path::new("/tmp/79990001122.json"),
        "79990001122".to_string(),
        contents,
        dead,
        now(),
    )
    .expect("valid account file")
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write account file");
    path
}

#[test]
fn parses_counters_and_working_status() {
    let account = parse(
        r#"{"stats_spam_count": 42, "stats_invites_count": 3, "register_time": 1735689600}"#,
        false,
    );
    assert_eq!(account.phone, "79990001122");
    assert_eq!(account.status, AccountStatus::Working);
    assert_eq!(account.messages_sent, 42);
    assert_eq!(account.invites_sent, 3);
    assert_eq!(
        account.registration_date,
        NaiveDate::from_ymd_opt(2025, 1, 1)
    );
}

#[test]
fn missing_counters_default_to_zero() {
    let account = parse("{}", false);
    assert_eq!(account.messages_sent, 0);
    assert_eq!(account.invites_sent, 0);
    assert_eq!(account.registration_date, None);
}

#[test]
fn session_created_date_is_the_fallback_registration_date() {
    let account = parse(
        r#"{"register_time": 0, "session_created_date": "2024-11-05T10:22:00"}"#,
        false,
    );
    assert_eq!(
        account.registration_date,
        NaiveDate::from_ymd_opt(2024, 11, 5)
    );

    let garbage = parse(r#"{"session_created_date": "yesterday"}"#, false);
    assert_eq!(garbage.registration_date, None);
}

#[test]
fn spamblock_and_freeze_drive_the_status() {
    assert_eq!(
        parse(r#"{"spamblock": "permanent"}"#, false).status,
        AccountStatus::PermanentSpamblock
    );
    assert_eq!(
        parse(r#"{"spamblock": "temporary"}"#, false).status,
        AccountStatus::TemporarySpamblock
    );
    assert_eq!(
        parse(r#"{"spamblock": "none"}"#, false).status,
        AccountStatus::Working
    );
    assert_eq!(
        parse(r#"{"freeze_until": "2025-03-11T00:00:00+00:00"}"#, false).status,
        AccountStatus::Frozen
    );
    assert_eq!(
        parse(r#"{"freeze_until": "2025-03-01T00:00:00+00:00"}"#, false).status,
        AccountStatus::Working
    );
    assert_eq!(
        parse(r#"{"freeze_until": 12345}"#, false).status,
        AccountStatus::Frozen
    );
}

#[test]
fn dead_folder_overrides_everything() {
    let account = parse(r#"{"spamblock": "temporary"}"#, true);
    assert_eq!(account.status, AccountStatus::Banned);
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = parse_account(
        Path::new("broken.json"),
        "broken".to_string(),
        "{not json",
        false,
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, ScanError::Parse { .. }));
}

#[test]
fn phone_comes_from_file_name_before_first_dot() {
    assert_eq!(
        phone_from_path(Path::new("accounts/79990001122.session.json")).as_deref(),
        Some("79990001122")
    );
    assert_eq!(phone_from_path(Path::new("accounts/.json")), None);
}

#[test]
fn scan_folder_skips_unreadable_files_and_non_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "111.json", r#"{"stats_spam_count": 1}"#);
    write(dir.path(), "222.json", "{corrupt");
    write(dir.path(), "333.txt", "{}");
    fs::create_dir(dir.path().join("nested")).expect("mkdir");
    write(&dir.path().join("nested"), "444.json", "{}");

    let accounts = scan_folder(dir.path(), false, now());
    let phones: Vec<&str> = accounts.iter().map(|a| a.phone.as_str()).collect();
    assert_eq!(phones, vec!["111"]);
}

#[test]
fn scan_folder_on_missing_dir_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(scan_folder(&dir.path().join("absent"), false, now()).is_empty());
}

#[test]
fn recursive_listing_descends_into_subfolders() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("a").join("b");
    fs::create_dir_all(&nested).expect("mkdir");
    write(dir.path(), "1.json", "{}");
    write(&nested, "2.json", "{}");

    let files = json_files_recursive(dir.path());
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|p| p.ends_with("a/b/2.json")));
}

#[test]
fn is_inside_compares_path_components() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dead = dir.path().join("dead");
    assert!(is_inside(&dead.join("1.json"), &dead));
    assert!(!is_inside(&dir.path().join("dead-after").join("1.json"), &dead));
}
