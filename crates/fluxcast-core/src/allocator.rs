//! Budget allocation suggestions
//!
//! Turns historical spending into per-category allocation suggestions that
//! always fit the allocatable ceiling, plus a fixed decision table for
//! naming a brand-new budget pod. Amounts are rounded to whole currency
//! units at the edges of each suggestion.

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::models::{
    AllocationRecommendation, BudgetAllocation, Pod, RiskLevel, Transaction, TxType,
};
use crate::stats;

/// Share of income held back before anything is allocatable
const INCOME_BUFFER_SHARE: f64 = 0.1;
/// Utilization bounds for the risk assessment
const HIGH_UTILIZATION: f64 = 0.95;
const LOW_UTILIZATION: f64 = 0.7;
/// Confidence when allocations come from trained budget shares alone
const TRAINED_SHARE_CONFIDENCE: f64 = 0.55;

// New-pod decision table constants. These are load-bearing for behavioral
// compatibility; tests pin them.
const POD_MATCHED_CONFIDENCE: f64 = 0.75;
const POD_MATCHED_NO_HISTORY_CONFIDENCE: f64 = 0.4;
const POD_UNMATCHED_CONFIDENCE: f64 = 0.5;
const POD_MATCHED_BUFFER: f64 = 1.15;
const POD_NO_HISTORY_BUDGET_SHARE: f64 = 0.1;
const POD_UNMATCHED_BUDGET_SHARE: f64 = 0.15;

/// Pod-name patterns tried in order; first hit wins
const POD_NAME_PATTERNS: &[(&str, &str)] = &[
    (r"entertainment|fun|leisure", "Entertainment"),
    (r"dining|food|restaurant", "Dining"),
    (r"transport|travel|commute", "Transport"),
    (r"shopping|retail", "Shopping"),
    (r"health|fitness|gym", "Health"),
    (r"tech|software|subscription", "Tech"),
    (r"essential|necessity|basic", "Essentials"),
];

#[derive(Debug, Default)]
struct CategorySpend {
    total: f64,
    count: usize,
}

pub struct BudgetAllocator<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> BudgetAllocator<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    pub fn allocate(
        &self,
        available_budget: f64,
        history: &[Transaction],
        monthly_income: f64,
        goal_contributions: f64,
    ) -> AllocationRecommendation {
        let mut spending: HashMap<String, CategorySpend> = HashMap::new();
        for tx in history.iter().filter(|tx| tx.tx_type == TxType::Expense) {
            let entry = spending.entry(tx.category.clone()).or_default();
            entry.total += tx.amount.abs();
            entry.count += 1;
        }

        let dates: Vec<chrono::NaiveDate> = history.iter().map(|tx| tx.date).collect();
        let span = stats::span_days(&dates);

        // Allocatable ceiling: income less goals less a safety buffer,
        // never more than what the caller says is actually available
        let buffer = monthly_income * INCOME_BUFFER_SHARE;
        let computed = (monthly_income - goal_contributions - buffer).max(0.0);
        let allocatable = if available_budget > 0.0 {
            available_budget.min(computed)
        } else {
            computed
        };

        let mut allocations = self.build_allocations(&spending, span, allocatable);

        allocations.sort_by(|a, b| {
            b.suggested_amount
                .partial_cmp(&a.suggested_amount)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.category.cmp(&b.category))
        });

        // Scale everything down proportionally when the naive sum busts
        // the ceiling, min/max bands included
        let naive_total: f64 = allocations.iter().map(|a| a.suggested_amount).sum();
        if allocatable > 0.0 && naive_total > allocatable {
            let scale = allocatable / naive_total;
            debug!(naive_total, allocatable, scale, "scaling allocations");
            for alloc in &mut allocations {
                // Floor keeps the rounded total at or under the ceiling
                alloc.suggested_amount = (alloc.suggested_amount * scale).floor();
                alloc.min_amount = (alloc.min_amount * scale).floor();
                alloc.max_amount = (alloc.max_amount * scale).floor();
            }
        }

        let total: f64 = allocations.iter().map(|a| a.suggested_amount).sum();
        let utilization = if allocatable > 0.0 {
            total / allocatable
        } else {
            0.0
        };
        let risk_assessment = if utilization > HIGH_UTILIZATION {
            RiskLevel::High
        } else if utilization < LOW_UTILIZATION {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        };

        AllocationRecommendation {
            total_suggested: total,
            expected_savings: (allocatable - total).max(0.0),
            risk_assessment,
            allocations,
        }
    }

    fn build_allocations(
        &self,
        spending: &HashMap<String, CategorySpend>,
        span: f64,
        allocatable: f64,
    ) -> Vec<BudgetAllocation> {
        // No history at all: trained budget shares carry the suggestion
        if spending.is_empty() {
            let mut shares: Vec<(&String, &f64)> = self.kb.budget_shares().iter().collect();
            shares.sort_by(|a, b| a.0.cmp(b.0));
            return shares
                .into_iter()
                .map(|(category, share)| {
                    let suggested = allocatable * share;
                    BudgetAllocation {
                        category: category.clone(),
                        suggested_amount: suggested.round(),
                        confidence: TRAINED_SHARE_CONFIDENCE,
                        reasoning: format!("Based on trained budget shares for {}", category),
                        min_amount: (suggested * 0.75).round(),
                        max_amount: (suggested * 1.4).round(),
                    }
                })
                .collect();
        }

        let monthly_total: f64 = spending.values().map(|s| s.total / span * 30.0).sum();
        let global_monthly_average = monthly_total / spending.len() as f64;

        spending
            .iter()
            .map(|(category, historical)| {
                let historical_monthly = historical.total / span * 30.0;
                // Thin categories are smoothed toward the global average
                let smoothing = (1.0 - historical.count as f64 / 8.0).clamp(0.2, 0.7);
                let adjusted_monthly = if global_monthly_average > 0.0 {
                    historical_monthly * (1.0 - smoothing) + global_monthly_average * smoothing
                } else {
                    historical_monthly
                };

                let buffer_factor = if historical.count < 5 { 1.05 } else { 1.1 };
                let suggested = adjusted_monthly * buffer_factor;

                let confidence = ((0.45
                    + (historical.count as f64 / 12.0) * 0.35
                    + (span / 90.0) * 0.2)
                    .min(0.95))
                    * (1.0 - smoothing * 0.3);

                let mut reasoning = format!(
                    "Based on your historical spending of {:.0}/month",
                    adjusted_monthly
                );
                if historical.count < 5 {
                    reasoning.push_str(" (limited data, using estimates)");
                }
                if suggested > adjusted_monthly * 1.2 {
                    reasoning.push_str(". Increased by 10% for safety buffer.");
                }

                BudgetAllocation {
                    category: category.clone(),
                    suggested_amount: suggested.round(),
                    confidence,
                    reasoning,
                    min_amount: (adjusted_monthly * 0.8).round(),
                    max_amount: (adjusted_monthly * 1.5).round(),
                }
            })
            .collect()
    }

    /// Suggest an allocation for a brand-new pod from its free-text name.
    ///
    /// Fixed decision table: matched category with history, matched without
    /// history, and unmatched each have their own constants.
    pub fn new_pod_allocation(
        &self,
        pod_name: &str,
        available_budget: f64,
        history: &[Transaction],
        existing_pods: &[Pod],
    ) -> Result<BudgetAllocation> {
        let name = pod_name.to_lowercase();
        let mut matched: Option<&str> = None;
        for (pattern, category) in POD_NAME_PATTERNS {
            if Regex::new(pattern)?.is_match(&name) {
                matched = Some(category);
                break;
            }
        }

        let Some(category) = matched else {
            // Unmatched: average of existing pods, or a budget share when
            // there is nothing to average
            let average = if existing_pods.is_empty() {
                available_budget * POD_UNMATCHED_BUDGET_SHARE
            } else {
                existing_pods.iter().map(|p| p.allocated).sum::<f64>()
                    / existing_pods.len() as f64
            };
            return Ok(BudgetAllocation {
                category: "Custom".to_string(),
                suggested_amount: average.round(),
                confidence: POD_UNMATCHED_CONFIDENCE,
                reasoning: format!("Suggested based on average pod size of {:.0}", average),
                min_amount: (average * 0.5).round(),
                max_amount: (average * 2.0).round(),
            });
        };

        let category_tx: Vec<&Transaction> = history
            .iter()
            .filter(|tx| tx.category == category && tx.tx_type == TxType::Expense)
            .collect();

        if category_tx.is_empty() {
            return Ok(BudgetAllocation {
                category: category.to_string(),
                suggested_amount: (available_budget * POD_NO_HISTORY_BUDGET_SHARE).round(),
                confidence: POD_MATCHED_NO_HISTORY_CONFIDENCE,
                reasoning: format!(
                    "No historical data for {}, suggesting 10% of available budget",
                    category
                ),
                min_amount: (available_budget * 0.05).round(),
                max_amount: (available_budget * 0.2).round(),
            });
        }

        let dates: Vec<chrono::NaiveDate> = category_tx.iter().map(|tx| tx.date).collect();
        let span = stats::span_days(&dates);
        let monthly =
            category_tx.iter().map(|tx| tx.amount.abs()).sum::<f64>() / span * 30.0;

        Ok(BudgetAllocation {
            category: category.to_string(),
            suggested_amount: (monthly * POD_MATCHED_BUFFER).round(),
            confidence: POD_MATCHED_CONFIDENCE,
            reasoning: format!(
                "Based on your historical {} spending of {:.0}/month",
                category, monthly
            ),
            min_amount: (monthly * 0.8).round(),
            max_amount: (monthly * 1.5).round(),
        })
    }
}
