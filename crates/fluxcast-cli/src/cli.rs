//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fluxcast - Predictive analytics over your transaction history
#[derive(Parser)]
#[command(name = "fluxcast")]
#[command(about = "Categorize, forecast, and budget from a transaction history", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Transaction history file (.json or .csv)
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,

    /// Monthly income used by goal and budget queries
    #[arg(long, default_value_t = 0.0, global = true)]
    pub income: f64,

    /// Knowledge bundle override (.json); defaults to the embedded bundle
    #[arg(long, global = true)]
    pub knowledge: Option<PathBuf>,

    /// Anchor date for forecasts and goal horizons (YYYY-MM-DD, default today)
    #[arg(long, global = true)]
    pub as_of: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Categorize a transaction description
    Categorize {
        /// Transaction description text
        #[arg(short, long)]
        description: String,

        /// Transaction amount
        #[arg(short, long)]
        amount: f64,

        /// Merchant name, if known
        #[arg(short, long)]
        merchant: Option<String>,

        /// Transaction type: income or expense (inferred if omitted)
        #[arg(short = 't', long)]
        tx_type: Option<String>,
    },

    /// Check a transaction for anomalies against the history
    Anomaly {
        #[arg(short, long)]
        description: String,

        #[arg(short, long)]
        amount: f64,

        /// Category the transaction was filed under
        #[arg(short, long)]
        category: String,

        /// Transaction type: income or expense
        #[arg(short = 't', long, default_value = "expense")]
        tx_type: String,

        /// Transaction date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[arg(short, long)]
        merchant: Option<String>,
    },

    /// Forecast category spending for a budget period
    Forecast {
        #[arg(short, long)]
        category: String,

        /// Amount allocated to the category this period
        #[arg(long, default_value_t = 0.0)]
        allocated: f64,

        /// Amount already spent this period
        #[arg(long, default_value_t = 0.0)]
        spent: f64,

        /// Budget period length in days
        #[arg(long, default_value_t = 30.0)]
        period_days: f64,
    },

    /// Predict completion of a savings goal
    Goal {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        target: f64,

        #[arg(long, default_value_t = 0.0)]
        current: f64,

        /// Monthly contribution toward this goal
        #[arg(long, default_value_t = 0.0)]
        contribution: f64,

        /// Goal deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: String,

        /// Other goals' monthly contributions (repeatable)
        #[arg(long = "other-contribution")]
        other_contributions: Vec<f64>,
    },

    /// Suggest budget allocations across historical categories
    Allocate {
        /// Available budget ceiling (0 = derive from income)
        #[arg(long, default_value_t = 0.0)]
        budget: f64,

        /// Active goals' monthly contributions (repeatable)
        #[arg(long = "goal-contribution")]
        goal_contributions: Vec<f64>,
    },

    /// Suggest an allocation for a new budget pod by name
    Pod {
        /// Free-text pod name to match against categories
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        budget: f64,

        /// Existing pods as NAME=ALLOCATED (repeatable)
        #[arg(long = "existing")]
        existing: Vec<String>,
    },

    /// Show dashboard insights over the history
    Insights,
}
