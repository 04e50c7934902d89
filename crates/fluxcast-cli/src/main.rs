//! Fluxcast CLI - Predictive analytics over a transaction history
//!
//! Usage:
//!   fluxcast --history tx.json categorize -d "Starbucks Coffee" -a 450
//!   fluxcast --history tx.json forecast -c Food --allocated 200000
//!   fluxcast --history tx.json --income 400000 allocate
//!   fluxcast --history tx.json insights

mod cli;
mod commands;
mod ingest;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
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

    let engine = commands::build_engine(
        cli.history.as_deref(),
        cli.income,
        cli.knowledge.as_deref(),
    )?;
    let as_of = commands::resolve_as_of(cli.as_of.as_deref())?;

    match cli.command {
        Commands::Categorize {
            description,
            amount,
            merchant,
            tx_type,
        } => commands::cmd_categorize(
            &engine,
            &description,
            amount,
            merchant.as_deref(),
            tx_type.as_deref(),
        ),
        Commands::Anomaly {
            description,
            amount,
            category,
            tx_type,
            date,
            merchant,
        } => commands::cmd_anomaly(
            &engine,
            &description,
            amount,
            &category,
            &tx_type,
            &date,
            merchant.as_deref(),
        ),
        Commands::Forecast {
            category,
            allocated,
            spent,
            period_days,
        } => commands::cmd_forecast(&engine, &category, allocated, spent, period_days, as_of),
        Commands::Goal {
            name,
            target,
            current,
            contribution,
            deadline,
            other_contributions,
        } => commands::cmd_goal(
            &engine,
            &name,
            target,
            current,
            contribution,
            &deadline,
            &other_contributions,
            as_of,
        ),
        Commands::Allocate {
            budget,
            goal_contributions,
        } => commands::cmd_allocate(&engine, budget, &goal_contributions),
        Commands::Pod {
            name,
            budget,
            existing,
        } => commands::cmd_pod(&engine, &name, budget, &existing),
        Commands::Insights => commands::cmd_insights(&engine),
    }
}
