//! Command implementations
//!
//! Each command builds the engine from the global flags, runs one query,
//! and prints the result record as pretty JSON.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use fluxcast_core::{Engine, Goal, KnowledgeBase, Pod, Transaction, TxType};

use crate::ingest;

/// Build an engine from the global flags: knowledge bundle, history
/// file, and income.
pub fn build_engine(
    history: Option<&Path>,
    income: f64,
    knowledge: Option<&Path>,
) -> Result<Engine> {
    let kb = match knowledge {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read knowledge bundle {}", path.display()))?;
            KnowledgeBase::from_json(&json)?
        }
        None => KnowledgeBase::load_default()?,
    };
    let mut engine = Engine::new(kb)?;

    let transactions = match history {
        Some(path) => ingest::load_history(path)?,
        None => Vec::new(),
    };
    engine.initialize(transactions, income);
    Ok(engine)
}

pub fn resolve_as_of(as_of: Option<&str>) -> Result<NaiveDate> {
    match as_of {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid --as-of date {:?} (use YYYY-MM-DD)", s)),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn cmd_categorize(
    engine: &Engine,
    description: &str,
    amount: f64,
    merchant: Option<&str>,
    tx_type: Option<&str>,
) -> Result<()> {
    let tx_type = tx_type
        .map(|t| t.parse::<TxType>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let result = engine.categorize(description, amount, merchant, tx_type);
    print_json(&result)
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_anomaly(
    engine: &Engine,
    description: &str,
    amount: f64,
    category: &str,
    tx_type: &str,
    date: &str,
    merchant: Option<&str>,
) -> Result<()> {
    let transaction = Transaction {
        description: description.to_string(),
        amount: amount.abs(),
        merchant: merchant.map(str::to_string),
        category: category.to_string(),
        tx_type: tx_type.parse::<TxType>().map_err(|e| anyhow!(e))?,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("Invalid --date {:?} (use YYYY-MM-DD)", date))?,
    };
    let result = engine.detect_anomaly(&transaction);
    print_json(&result)
}

pub fn cmd_forecast(
    engine: &Engine,
    category: &str,
    allocated: f64,
    spent: f64,
    period_days: f64,
    as_of: NaiveDate,
) -> Result<()> {
    let forecast = engine.forecast_spending(category, allocated, spent, period_days, as_of);
    print_json(&forecast)
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_goal(
    engine: &Engine,
    name: &str,
    target: f64,
    current: f64,
    contribution: f64,
    deadline: &str,
    other_contributions: &[f64],
    as_of: NaiveDate,
) -> Result<()> {
    let goal = Goal {
        name: name.to_string(),
        target_amount: target,
        current_amount: current,
        monthly_contribution: contribution,
        deadline: NaiveDate::parse_from_str(deadline, "%Y-%m-%d")
            .with_context(|| format!("Invalid --deadline {:?} (use YYYY-MM-DD)", deadline))?,
    };
    // Model the sibling goals as anonymous contribution-only entries
    let mut active = vec![goal.clone()];
    for (index, amount) in other_contributions.iter().enumerate() {
        active.push(Goal {
            name: format!("other-{}", index),
            target_amount: 0.0,
            current_amount: 0.0,
            monthly_contribution: *amount,
            deadline: goal.deadline,
        });
    }
    let prediction = engine.predict_goal(&goal, &active, as_of);
    print_json(&prediction)
}

pub fn cmd_allocate(engine: &Engine, budget: f64, goal_contributions: &[f64]) -> Result<()> {
    let goals: Vec<Goal> = goal_contributions
        .iter()
        .enumerate()
        .map(|(index, amount)| Goal {
            name: format!("goal-{}", index),
            target_amount: 0.0,
            current_amount: 0.0,
            monthly_contribution: *amount,
            deadline: NaiveDate::MAX,
        })
        .collect();
    let recommendation = engine.suggest_budget_allocation(budget, &goals);
    print_json(&recommendation)
}

pub fn cmd_pod(engine: &Engine, name: &str, budget: f64, existing: &[String]) -> Result<()> {
    let pods = existing
        .iter()
        .map(|spec| parse_pod(spec))
        .collect::<Result<Vec<Pod>>>()?;
    let allocation = engine.suggest_new_pod_allocation(name, budget, &pods)?;
    print_json(&allocation)
}

pub fn cmd_insights(engine: &Engine) -> Result<()> {
    print_json(&engine.dashboard_insights())
}

/// Parse a NAME=ALLOCATED pod spec
fn parse_pod(spec: &str) -> Result<Pod> {
    let (name, allocated) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid pod spec {:?} (use NAME=ALLOCATED)", spec))?;
    Ok(Pod {
        name: name.to_string(),
        allocated: allocated
            .parse::<f64>()
            .with_context(|| format!("Invalid pod allocation in {:?}", spec))?,
    })
}
