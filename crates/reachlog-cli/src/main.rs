mod api_client;
mod ingest;
mod retry;
mod roster;
mod scanner;

use anyhow::Context;
use clap::{Parser, Subcommand};
use reachlog_core::{NewCampaign, SnapshotType};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use crate::api_client::ReachlogClient;

#[derive(Debug, Parser)]
#[command(name = "reachlog-cli")]
#[command(about = "Outreach campaign snapshot client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Campaign master data
    Campaign {
        #[command(subcommand)]
        command: CampaignCommands,
    },
    /// Scan account files and submit a snapshot
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// Account-wide maintenance
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, Subcommand)]
enum CampaignCommands {
    /// Register a campaign before its first snapshot
    Create {
        name: String,
        #[arg(long)]
        cost_per_message: Decimal,
        #[arg(long)]
        cost_per_invite: Decimal,
        #[arg(long)]
        message_type: Option<String>,
        #[arg(long)]
        base_type: Option<String>,
        #[arg(long)]
        link_type: Option<String>,
        #[arg(long)]
        offer: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum SnapshotCommands {
    /// Baseline taken right before the campaign runs
    Before { campaign: String },
    /// Right after the campaign; defaults to the most recent campaign
    After { campaign: Option<String> },
    /// Follow-up on the day after the campaign
    NextDay { campaign: String },
}

#[derive(Debug, Subcommand)]
enum AccountsCommands {
    /// Refresh every account and record bans against their last campaign
    UpdateAll,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(
                std::env::var("REACHLOG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            )
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn api_client() -> anyhow::Result<(reachlog_core::ClientConfig, ReachlogClient)> {
    let config = reachlog_core::load_client_config().context("invalid client configuration")?;
    let client = ReachlogClient::from_config(&config).context("failed to build HTTP client")?;
    Ok((config, client))
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    let pool = reachlog_db::connect_pool_from_env().await?;
    match command {
        DbCommands::Ping => {
            reachlog_db::ping(&pool).await?;
            println!("database reachable");
        }
        DbCommands::Migrate => {
            let applied = reachlog_db::run_migrations(&pool).await?;
            println!("migrations applied ({applied} total)");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => run_db(command).await?,
        Some(Commands::Campaign {
            command:
                CampaignCommands::Create {
                    name,
                    cost_per_message,
                    cost_per_invite,
                    message_type,
                    base_type,
                    link_type,
                    offer,
                },
        }) => {
            let campaign = NewCampaign {
                name,
                cost_per_message,
                cost_per_invite,
                message_type,
                base_type,
                link_type,
                offer,
            }
            .validate()?;
            let (_, client) = api_client()?;
            let created = client.create_campaign(&campaign).await?;
            tracing::info!(id = created.id, name = %created.name, "campaign created");
            println!(
                "campaign '{}' created (id {}, dated {})",
                created.name, created.id, created.campaign_date
            );
        }
        Some(Commands::Snapshot { command }) => {
            let (config, client) = api_client()?;
            match command {
                SnapshotCommands::Before { campaign } => {
                    ingest::run_snapshot_before(&config, &client, &campaign).await?;
                }
                SnapshotCommands::After { campaign } => {
                    ingest::run_snapshot_after(
                        &config,
                        &client,
                        campaign.as_deref(),
                        SnapshotType::AfterImmediate,
                    )
                    .await?;
                }
                SnapshotCommands::NextDay { campaign } => {
                    ingest::run_snapshot_after(
                        &config,
                        &client,
                        Some(&campaign),
                        SnapshotType::AfterDay2,
                    )
                    .await?;
                }
            }
        }
        Some(Commands::Accounts {
            command: AccountsCommands::UpdateAll,
        }) => {
            let (config, client) = api_client()?;
            ingest::run_update_all(&config, &client).await?;
        }
        None => println!("reachlog-cli: run with --help to list commands"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
