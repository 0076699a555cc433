//! Nudge CLI - Behavioral spending guard
//!
//! Usage:
//!   nudge init                    Initialize database
//!   nudge import --file CSV       Import and evaluate transactions
//!   nudge evaluate -a 150 -d ...  Evaluate a single purchase
//!   nudge pending                 List purchases waiting for confirmation
//!   nudge goals add NAME -t 5000  Add a savings goal
//!   nudge alerts                  List unacknowledged alerts
//!   nudge serve --port 3000       Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import { file, source, sign } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let guard = commands::load_guard(config_path)?;
            commands::cmd_import(&db, &guard, &file, &source, sign.as_deref())
        }
        Commands::Evaluate {
            amount,
            description,
            timestamp,
            category,
            payee,
            store,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let guard = commands::load_guard(config_path)?;
            let input = commands::EvaluateInput {
                amount,
                description,
                timestamp,
                category,
                payee,
            };
            commands::cmd_evaluate(&db, &guard, input, store, json)
        }
        Commands::Transactions { limit, flag, all } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_transactions_list(&db, limit, flag.as_deref(), all)
        }
        Commands::Correct {
            id,
            amount,
            description,
            timestamp,
            category,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let guard = commands::load_guard(config_path)?;
            let changes = commands::Correction {
                amount,
                description,
                timestamp,
                category,
            };
            commands::cmd_correct(&db, &guard, id, changes)
        }
        Commands::Pending => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_pending(&db)
        }
        Commands::Confirm { id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_confirm(&db, id)
        }
        Commands::Cancel { id } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_cancel(&db, id)
        }
        Commands::Release => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_release(&db)
        }
        Commands::Protection { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(ProtectionAction::Status) => {
                    let guard = commands::load_guard(config_path)?;
                    commands::cmd_protection_status(&db, &guard)
                }
                Some(ProtectionAction::Enable) => commands::cmd_protection_enable(&db),
                Some(ProtectionAction::Disable) => commands::cmd_protection_disable(&db),
                Some(ProtectionAction::Bypass { minutes }) => {
                    commands::cmd_protection_bypass(&db, minutes)
                }
            }
        }
        Commands::Goals { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                GoalAction::Add {
                    name,
                    target,
                    current,
                } => commands::cmd_goals_add(&db, &name, target, current),
                GoalAction::List { all } => commands::cmd_goals_list(&db, all),
                GoalAction::Progress { id, saved } => commands::cmd_goals_progress(&db, id, saved),
                GoalAction::Status { id, status } => commands::cmd_goals_status(&db, id, &status),
                GoalAction::Delete { id } => commands::cmd_goals_delete(&db, id),
            }
        }
        Commands::Alerts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_alerts_list(&db, false),
                Some(AlertAction::List { all }) => commands::cmd_alerts_list(&db, all),
                Some(AlertAction::Ack { id }) => commands::cmd_alerts_ack(&db, id),
            }
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match report_type {
                ReportType::Decendio { month } => {
                    let (year, month) = commands::resolve_month(month.as_deref())?;
                    commands::cmd_report_decendio(&db, year, month)
                }
                ReportType::Summary { from, to } => {
                    let from = commands::parse_date_arg(from.as_deref(), "--from")?;
                    let to = commands::parse_date_arg(to.as_deref(), "--to")?;
                    commands::cmd_report_summary(&db, from, to)
                }
                ReportType::Flags { from, to } => {
                    let from = commands::parse_date_arg(from.as_deref(), "--from")?;
                    let to = commands::parse_date_arg(to.as_deref(), "--to")?;
                    commands::cmd_report_flags(&db, from, to)
                }
            }
        }
        Commands::Config { path } => commands::cmd_config(config_path, path),
        Commands::Status => commands::cmd_status(&cli.db, config_path, cli.no_encrypt),
        Commands::Audit { limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_audit(&db, limit)
        }
        Commands::Serve { port, host } => {
            commands::cmd_serve(&cli.db, config_path, &host, port, cli.no_encrypt).await
        }
    }
}
