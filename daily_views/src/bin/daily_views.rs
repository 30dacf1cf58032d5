use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use daily_views::{
    DailyViewsService,
    config::load_config_path,
    db::{connection::connect_sqlite, migrate},
    identity::directory,
};
use tracing_subscriber::EnvFilter;
use view_sources::models::writer::SessionId;

#[derive(Parser)]
#[command(version, about = "Daily views reconciliation CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print a writer's reconciled daily views as JSON
    Views(ViewsCmd),
    /// Manage the writer directory
    Directory(DirectoryCmd),
}

#[derive(Args)]
struct ViewsCmd {
    /// Path to the config file
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Writer id
    #[arg(long, conflicts_with = "session", required_unless_present = "session")]
    writer_id: Option<i64>,

    /// Session token issued at login
    #[arg(long)]
    session: Option<String>,

    /// First day, YYYY-MM-DD, in the canonical time zone
    #[arg(long)]
    start: NaiveDate,

    /// Last day (inclusive), YYYY-MM-DD
    #[arg(long)]
    end: NaiveDate,

    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct DirectoryCmd {
    #[command(subcommand)]
    sub: DirectorySub,
}

#[derive(Subcommand)]
enum DirectorySub {
    /// Apply pending migrations
    Migrate {
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Insert or rename a writer, optionally binding a session to it
    AddWriter {
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Views(args) => {
            let cfg = load_config_path(&args.config)?;
            let service = DailyViewsService::from_config(&cfg)?;

            let result = match (args.writer_id, args.session) {
                (Some(id), _) => service.get_daily_views(id, args.start, args.end).await,
                (None, Some(token)) => {
                    service
                        .get_daily_views_for_session(&SessionId::new(token), args.start, args.end)
                        .await
                }
                (None, None) => anyhow::bail!("either --writer-id or --session is required"),
            }?;

            let json = if args.pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{json}");
        }
        Cmd::Directory(DirectoryCmd { sub }) => match sub {
            DirectorySub::Migrate { config } => {
                let cfg = load_config_path(&config)?;
                let applied = migrate::run_sqlite(&cfg.identity.database_url)?;
                tracing::info!(applied, "writer directory up to date");
            }
            DirectorySub::AddWriter {
                config,
                id,
                name,
                session,
            } => {
                let cfg = load_config_path(&config)?;
                let mut conn = connect_sqlite(&cfg.identity.database_url)?;
                migrate::run_pending(&mut conn)?;
                directory::upsert_writer(&mut conn, id, &name).context("insert writer")?;
                if let Some(token) = session {
                    directory::upsert_session(&mut conn, &token, id).context("bind session")?;
                }
                tracing::info!(id, %name, "writer stored");
            }
        },
    }

    Ok(())
}
