use super::*;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["reachlog-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["reachlog-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["reachlog-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn snapshot_before_requires_campaign() {
    assert!(Cli::try_parse_from(["reachlog-cli", "snapshot", "before"]).is_err());

    let cli = Cli::try_parse_from(["reachlog-cli", "snapshot", "before", "acme_april"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshot {
            command: SnapshotCommands::Before { ref campaign }
        }) if campaign == "acme_april"
    ));
}

#[test]
fn snapshot_after_campaign_is_optional() {
    let cli = Cli::try_parse_from(["reachlog-cli", "snapshot", "after"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshot {
            command: SnapshotCommands::After { campaign: None }
        })
    ));

    let cli = Cli::try_parse_from(["reachlog-cli", "snapshot", "after", "acme_april"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshot {
            command: SnapshotCommands::After { campaign: Some(ref c) }
        }) if c == "acme_april"
    ));
}

#[test]
fn snapshot_next_day_uses_kebab_case() {
    let cli = Cli::try_parse_from(["reachlog-cli", "snapshot", "next-day", "acme_april"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshot {
            command: SnapshotCommands::NextDay { .. }
        })
    ));
}

#[test]
fn parses_accounts_update_all() {
    let cli = Cli::try_parse_from(["reachlog-cli", "accounts", "update-all"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Accounts {
            command: AccountsCommands::UpdateAll
        })
    ));
}

#[test]
fn campaign_create_parses_decimal_costs() {
    let cli = Cli::try_parse_from([
        "reachlog-cli",
        "campaign",
        "create",
        "acme_april",
        "--cost-per-message",
        "0.25",
        "--cost-per-invite",
        "1.5",
        "--offer",
        "crypto",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Campaign {
            command:
                CampaignCommands::Create {
                    name,
                    cost_per_message,
                    cost_per_invite,
                    offer,
                    message_type,
                    ..
                },
        }) => {
            assert_eq!(name, "acme_april");
            assert_eq!(cost_per_message, Decimal::new(25, 2));
            assert_eq!(cost_per_invite, Decimal::new(15, 1));
            assert_eq!(offer.as_deref(), Some("crypto"));
            assert!(message_type.is_none());
        }
        other => panic!("expected campaign create, got {other:?}"),
    }
}

#[test]
fn campaign_create_rejects_non_numeric_cost() {
    let result = Cli::try_parse_from([
        "reachlog-cli",
        "campaign",
        "create",
        "acme_april",
        "--cost-per-message",
        "cheap",
        "--cost-per-invite",
        "1",
    ]);
    assert!(result.is_err());
}
