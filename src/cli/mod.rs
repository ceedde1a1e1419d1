use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::PointService;
use crate::domain::{format_points, parse_points, Points, Transaction, UserId};
use crate::io::{write_history_csv, ExportFormat, Exporter};
use crate::logging::{init_logging, LogFormat};
use crate::storage::Repository;

/// Pointledger - per-user point balances with a transaction history
#[derive(Parser)]
#[command(name = "pointledger")]
#[command(about = "Charge, spend and audit per-user point balances")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "points.db")]
    pub database: String,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format: pretty, json
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Show a user's current balance
    Balance {
        /// User ID
        #[arg(allow_negative_numbers = true)]
        user: UserId,
    },

    /// Add points to a user's balance
    Charge {
        /// User ID
        #[arg(allow_negative_numbers = true)]
        user: UserId,

        /// Points to add (e.g., "5000" or "5,000")
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// Spend points from a user's balance
    Use {
        /// User ID
        #[arg(allow_negative_numbers = true)]
        user: UserId,

        /// Points to spend (e.g., "500" or "1,500")
        #[arg(allow_negative_numbers = true)]
        amount: String,
    },

    /// List a user's transactions, oldest first
    History {
        /// User ID
        #[arg(allow_negative_numbers = true)]
        user: UserId,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Verify that a user's history replays to the stored balance
    Check {
        /// User ID
        #[arg(allow_negative_numbers = true)]
        user: UserId,
    },

    /// Export a user's data to CSV or JSON
    Export {
        /// User ID
        #[arg(allow_negative_numbers = true)]
        user: UserId,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv (history only), json (balance and history)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let level = if self.verbose { "debug" } else { "warn" };
        init_logging(level, LogFormat::from_str_lossy(&self.log_format))?;

        match self.command {
            Commands::Init => {
                PointService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Balance { user } => {
                let service = PointService::connect(&self.database).await?;
                let balance = service.get_balance(user).await?;
                println!(
                    "User {}: {} points (updated {})",
                    balance.user_id(),
                    format_points(balance.amount()),
                    balance.updated_at().format("%Y-%m-%d %H:%M:%S")
                );
            }

            Commands::Charge { user, amount } => {
                let service = PointService::connect(&self.database).await?;
                let points = parse_amount(&amount)?;
                let balance = service.charge(user, points).await?;
                println!(
                    "Charged {} points to user {}. Balance: {}",
                    format_points(points),
                    user,
                    format_points(balance.amount())
                );
            }

            Commands::Use { user, amount } => {
                let service = PointService::connect(&self.database).await?;
                let points = parse_amount(&amount)?;
                let balance = service.use_points(user, points).await?;
                println!(
                    "Used {} points from user {}. Balance: {}",
                    format_points(points),
                    user,
                    format_points(balance.amount())
                );
            }

            Commands::History { user, format } => {
                let service = PointService::connect(&self.database).await?;
                run_history_command(&service, user, &format).await?;
            }

            Commands::Check { user } => {
                let service = PointService::connect(&self.database).await?;
                run_check_command(&service, user).await?;
            }

            Commands::Export {
                user,
                output,
                format,
            } => {
                let service = PointService::connect(&self.database).await?;
                run_export_command(&service, user, output.as_deref(), &format).await?;
            }
        }

        Ok(())
    }
}

fn parse_amount(input: &str) -> Result<Points> {
    parse_points(input).with_context(|| {
        format!(
            "Invalid amount '{}'. Use whole points like '5000' or '5,000'",
            input
        )
    })
}

async fn run_history_command(
    service: &PointService<Repository>,
    user: UserId,
    format: &str,
) -> Result<()> {
    let history = service.get_history(user).await?;

    match format {
        "table" => print_history_table(&history),
        "json" => println!("{}", serde_json::to_string_pretty(&history)?),
        "csv" => {
            write_history_csv(&history, std::io::stdout())?;
        }
        _ => anyhow::bail!("Invalid format '{}'. Valid formats: table, json, csv", format),
    }

    Ok(())
}

fn print_history_table(history: &[Transaction]) {
    if history.is_empty() {
        println!("No transactions found.");
        return;
    }

    println!("{:<8} {:<8} {:>12} {:<20}", "ID", "KIND", "AMOUNT", "DATE");
    println!("{}", "-".repeat(51));
    for tx in history {
        println!(
            "{:<8} {:<8} {:>12} {:<20}",
            tx.id(),
            tx.kind().as_str(),
            format_points(tx.amount()),
            tx.occurred_at().format("%Y-%m-%d %H:%M:%S")
        );
    }
}

async fn run_check_command(service: &PointService<Repository>, user: UserId) -> Result<()> {
    let report = service.check_consistency(user).await?;

    println!("User:         {}", report.user_id);
    println!("Transactions: {}", report.transaction_count);
    println!("Stored:       {}", format_points(report.stored));
    println!("Replayed:     {}", format_points(report.replayed));
    println!();

    if report.is_consistent() {
        println!("Balance is consistent with history.");
    } else {
        anyhow::bail!(
            "Balance drifted from history by {} points",
            format_points(report.drift())
        );
    }

    Ok(())
}

async fn run_export_command(
    service: &PointService<Repository>,
    user: UserId,
    output: Option<&str>,
    format: &str,
) -> Result<()> {
    use std::fs::File;
    use std::io::{stdout, Write};

    // Reject a bad format before an output file gets created or truncated.
    let format = ExportFormat::from_str(format).with_context(|| {
        format!("Invalid export format '{}'. Valid formats: csv, json", format)
    })?;

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = Exporter::new(service).export(user, format, writer).await?;

    if output.is_some() {
        eprintln!(
            "Exported {} transactions for user {} as {}",
            count,
            user,
            format.as_str()
        );
    }

    Ok(())
}
