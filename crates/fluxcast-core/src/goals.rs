//! Goal-completion prediction
//!
//! Runs a deterministic 1,000-trial Monte Carlo simulation over the goal's
//! contribution schedule. The generator is seeded from a SHA-256 hash of the
//! goal's identifying fields, so identical inputs always produce identical
//! predictions. No unseeded randomness exists anywhere in this module.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::knowledge::KnowledgeBase;
use crate::models::{
    AccelerationOpportunity, DataQuality, DateInterval, Goal, GoalPrediction, SuccessLikelihood,
    Transaction, TxType,
};
use crate::stats;

const SIMULATIONS: usize = 1_000;
/// Contribution perturbation: income variability
const CONTRIBUTION_VARIABILITY: f64 = 0.1;
/// Spend-side perturbation applied after the contribution draw
const SPENDING_VARIABILITY: f64 = 0.05;
/// Months-interval width as a fraction of the nominal months
const MONTHS_STDDEV_FRACTION: f64 = 0.15;
/// Share of free income a recommendation may claim
const AFFORDABILITY_SHARE: f64 = 0.7;
/// Assumed reducible share of a top spending category
const CATEGORY_REDUCTION: f64 = 0.2;
/// Acceleration suggestions below this many days saved are dropped
const MIN_DAYS_SAVED: f64 = 5.0;

pub struct GoalPredictor<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> GoalPredictor<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    pub fn predict(
        &self,
        goal: &Goal,
        history: &[Transaction],
        monthly_income: f64,
        other_goal_contributions: f64,
        as_of: NaiveDate,
    ) -> GoalPrediction {
        let remaining = goal.target_amount - goal.current_amount;

        let dates: Vec<NaiveDate> = history.iter().map(|tx| tx.date).collect();
        let time_span = stats::span_days(&dates);
        let quality_score = stats::data_quality_score(history.len(), 20.0, time_span);
        let quality = if history.len() >= 20 && time_span >= 60.0 {
            DataQuality::High
        } else if history.len() >= 10 {
            DataQuality::Medium
        } else {
            DataQuality::Low
        };

        if remaining <= 0.0 {
            return GoalPrediction {
                completion_probability: 1.0,
                predicted_completion_date: as_of,
                confidence_interval: DateInterval {
                    lower: as_of,
                    upper: as_of,
                },
                recommended_contribution: 0.0,
                risk_factors: Vec::new(),
                success_likelihood: SuccessLikelihood::VeryHigh,
                months_to_complete: 0.0,
                acceleration_opportunities: Vec::new(),
                data_quality: DataQuality::High,
            };
        }

        let days_until_deadline = (goal.deadline - as_of).num_days() as f64;
        let months_until_deadline = (days_until_deadline / 30.0).max(1.0 / 30.0);
        let required_monthly = remaining / months_until_deadline;
        let contribution = goal.monthly_contribution;

        let base_months = if contribution > 0.0 {
            remaining / contribution
        } else {
            months_until_deadline * 2.0
        };

        // Deterministic seeded simulation
        let raw_probability = if contribution > 0.0 {
            let mut rng = StdRng::seed_from_u64(goal_seed(goal));
            let mut successes = 0usize;
            for _ in 0..SIMULATIONS {
                let draw: f64 = rng.gen();
                let simulated =
                    contribution * (1.0 + (draw - 0.5) * CONTRIBUTION_VARIABILITY * 2.0);
                let draw: f64 = rng.gen();
                let effective = simulated * (1.0 - (draw - 0.5) * SPENDING_VARIABILITY * 2.0);
                // Floor at half the nominal rate so one bad draw cannot
                // blow the horizon up
                let months = remaining / effective.max(contribution * 0.5);
                if months * 30.0 <= days_until_deadline {
                    successes += 1;
                }
            }
            successes as f64 / SIMULATIONS as f64
        } else {
            0.0
        };

        // Thin history pulls the estimate toward the neutral 0.5 prior
        let quality_weight = 0.7 + quality_score * 0.3;
        let completion_probability =
            (raw_probability * quality_weight + 0.5 * (1.0 - quality_weight)).clamp(0.0, 1.0);

        let months_stddev = base_months * MONTHS_STDDEV_FRACTION;
        let lower_months = (base_months - 1.96 * months_stddev).max(0.0);
        let upper_months = (base_months + 1.96 * months_stddev).max(lower_months);

        let mut risk_factors = Vec::new();
        if contribution < required_monthly * 0.9 {
            risk_factors.push("Current contribution is below required rate".to_string());
        }
        if completion_probability < 0.7 {
            risk_factors.push("Low probability of on-time completion".to_string());
        }
        if days_until_deadline < 60.0 && remaining > goal.current_amount {
            risk_factors.push("Tight deadline with significant remaining amount".to_string());
        }
        if contribution <= 0.0 {
            risk_factors.push("No active monthly contribution".to_string());
        }
        if days_until_deadline <= 0.0 {
            risk_factors.push("Deadline has already passed".to_string());
        }
        if quality == DataQuality::Low {
            risk_factors.push("Limited historical data reduces prediction confidence".to_string());
        }

        // Recommendation, capped by what the income can actually carry
        let affordability_cap = if monthly_income > 0.0 {
            (monthly_income - other_goal_contributions).max(0.0) * AFFORDABILITY_SHARE
        } else {
            f64::INFINITY
        };
        let trained_rate = self.kb.savings_rate(monthly_income * 12.0);
        let trained_baseline = if trained_rate > 0.0 {
            monthly_income * trained_rate
        } else {
            0.0
        };
        let raw_recommendation = (required_monthly * 1.1)
            .max(contribution * 1.05)
            .max(trained_baseline * 0.9);
        let recommended_contribution = raw_recommendation.min(affordability_cap);
        if recommended_contribution < raw_recommendation {
            risk_factors.push("Recommended contribution limited by affordability".to_string());
        }
        if trained_baseline > 0.0 && contribution <= 0.0 {
            risk_factors.push("Recommendation uses trained savings baseline".to_string());
        }

        let acceleration_opportunities = self.acceleration_opportunities(
            history,
            time_span,
            recommended_contribution,
        );

        debug!(
            goal = %goal.name,
            probability = completion_probability,
            months = base_months,
            "goal predicted"
        );

        GoalPrediction {
            completion_probability,
            predicted_completion_date: add_months(as_of, base_months),
            confidence_interval: DateInterval {
                lower: add_months(as_of, lower_months),
                upper: add_months(as_of, upper_months),
            },
            recommended_contribution,
            risk_factors,
            success_likelihood: SuccessLikelihood::from_probability(completion_probability),
            months_to_complete: (base_months * 10.0).round() / 10.0,
            acceleration_opportunities,
            data_quality: quality,
        }
    }

    /// Predict a set of goals, keyed by goal name. Each goal's prediction
    /// treats every other goal's contribution as committed.
    pub fn predict_many(
        &self,
        goals: &[Goal],
        history: &[Transaction],
        monthly_income: f64,
        as_of: NaiveDate,
    ) -> HashMap<String, GoalPrediction> {
        let total: f64 = goals.iter().map(|g| g.monthly_contribution).sum();
        goals
            .iter()
            .map(|goal| {
                let others = (total - goal.monthly_contribution).max(0.0);
                (
                    goal.name.clone(),
                    self.predict(goal, history, monthly_income, others, as_of),
                )
            })
            .collect()
    }

    /// Top historical expense categories, each assumed reducible by 20%,
    /// converted to days shaved off the goal timeline
    fn acceleration_opportunities(
        &self,
        history: &[Transaction],
        time_span: f64,
        recommended_contribution: f64,
    ) -> Vec<AccelerationOpportunity> {
        if recommended_contribution <= 0.0 {
            return Vec::new();
        }

        let mut totals: HashMap<&str, f64> = HashMap::new();
        for tx in history.iter().filter(|tx| tx.tx_type == TxType::Expense) {
            *totals.entry(tx.category.as_str()).or_default() += tx.amount.abs();
        }

        let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        ranked
            .into_iter()
            .take(3)
            .filter_map(|(category, total)| {
                let monthly = total / time_span * 30.0;
                let potential = monthly * CATEGORY_REDUCTION;
                let days_saved = potential / recommended_contribution * 30.0;
                (days_saved > MIN_DAYS_SAVED).then(|| AccelerationOpportunity {
                    action: format!("Reduce {} spending by 20%", category),
                    days_saved: days_saved.round(),
                    confidence: 0.7,
                })
            })
            .collect()
    }
}

/// Seed derived from the goal's identifying fields. Same goal, same seed.
fn goal_seed(goal: &Goal) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(goal.name.as_bytes());
    hasher.update(b"|");
    hasher.update(goal.target_amount.to_le_bytes());
    hasher.update(goal.current_amount.to_le_bytes());
    hasher.update(goal.monthly_contribution.to_le_bytes());
    hasher.update(goal.deadline.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn add_months(date: NaiveDate, months: f64) -> NaiveDate {
    let days = (months * 30.0).round().max(0.0) as i64;
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(target: f64, current: f64, contribution: f64, deadline: (i32, u32, u32)) -> Goal {
        Goal {
            name: "Emergency Fund".to_string(),
            target_amount: target,
            current_amount: current,
            monthly_contribution: contribution,
            deadline: NaiveDate::from_ymd_opt(deadline.0, deadline.1, deadline.2).unwrap(),
        }
    }

    fn tx(amount: f64, category: &str, day: u32) -> Transaction {
        Transaction {
            description: format!("{} purchase", category),
            amount,
            merchant: None,
            category: category.to_string(),
            tx_type: TxType::Expense,
            date: NaiveDate::from_ymd_opt(2026, 1, day.clamp(1, 28)).unwrap(),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    #[test]
    fn test_completed_goal_short_circuits() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        let prediction = predictor.predict(
            &goal(100_000.0, 120_000.0, 10_000.0, (2026, 12, 31)),
            &[],
            500_000.0,
            0.0,
            as_of(),
        );
        assert_eq!(prediction.completion_probability, 1.0);
        assert_eq!(prediction.months_to_complete, 0.0);
        assert!(prediction.risk_factors.is_empty());
        assert_eq!(prediction.success_likelihood, SuccessLikelihood::VeryHigh);
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        let g = goal(600_000.0, 100_000.0, 50_000.0, (2027, 2, 1));
        let history: Vec<Transaction> = (1..=15).map(|d| tx(8_000.0, "Food", d)).collect();
        let first = predictor.predict(&g, &history, 400_000.0, 0.0, as_of());
        let second = predictor.predict(&g, &history, 400_000.0, 0.0, as_of());
        assert_eq!(
            first.completion_probability,
            second.completion_probability
        );
        assert_eq!(first.months_to_complete, second.months_to_complete);
        assert_eq!(
            first.predicted_completion_date,
            second.predicted_completion_date
        );
    }

    #[test]
    fn test_different_goals_usually_differ() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        let a = predictor.predict(
            &goal(600_000.0, 100_000.0, 42_000.0, (2027, 2, 1)),
            &[],
            400_000.0,
            0.0,
            as_of(),
        );
        let mut renamed = goal(600_000.0, 100_000.0, 42_000.0, (2027, 2, 1));
        renamed.name = "Vacation".to_string();
        let b = predictor.predict(&renamed, &[], 400_000.0, 0.0, as_of());
        // Different seeds; identical shape. The point is only that both are
        // valid, not that they agree trial-for-trial.
        assert!(a.completion_probability >= 0.0 && a.completion_probability <= 1.0);
        assert!(b.completion_probability >= 0.0 && b.completion_probability <= 1.0);
    }

    #[test]
    fn test_comfortable_goal_scores_high() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        // Needs ~42k/month over 12 months, contributing 80k
        let history: Vec<Transaction> = (1..=25).map(|d| tx(8_000.0, "Food", d)).collect();
        let prediction = predictor.predict(
            &goal(600_000.0, 100_000.0, 80_000.0, (2027, 2, 1)),
            &history,
            400_000.0,
            0.0,
            as_of(),
        );
        assert!(prediction.completion_probability > 0.7);
        assert!(prediction.months_to_complete > 0.0);
    }

    #[test]
    fn test_zero_contribution_scores_low() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        let prediction = predictor.predict(
            &goal(600_000.0, 100_000.0, 0.0, (2026, 8, 1)),
            &[],
            400_000.0,
            0.0,
            as_of(),
        );
        assert!(prediction.completion_probability <= 0.5);
        assert!(prediction
            .risk_factors
            .iter()
            .any(|r| r.contains("No active monthly contribution")));
        assert!(prediction.months_to_complete >= 0.0);
    }

    #[test]
    fn test_passed_deadline_flagged() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        let prediction = predictor.predict(
            &goal(600_000.0, 100_000.0, 50_000.0, (2026, 1, 1)),
            &[],
            400_000.0,
            0.0,
            as_of(),
        );
        assert!(prediction
            .risk_factors
            .iter()
            .any(|r| r.contains("Deadline has already passed")));
    }

    #[test]
    fn test_affordability_cap_binds_and_notes() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        // Tiny income, huge requirement: cap must bind
        let prediction = predictor.predict(
            &goal(1_000_000.0, 0.0, 10_000.0, (2026, 5, 1)),
            &[],
            50_000.0,
            20_000.0,
            as_of(),
        );
        let cap = (50_000.0 - 20_000.0) * AFFORDABILITY_SHARE;
        assert!(prediction.recommended_contribution <= cap + 1e-9);
        assert!(prediction
            .risk_factors
            .iter()
            .any(|r| r.contains("limited by affordability")));
    }

    #[test]
    fn test_acceleration_opportunities_come_from_top_categories() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        let mut history = Vec::new();
        for d in 1..=20 {
            history.push(tx(50_000.0, "Rent", d));
            history.push(tx(200.0, "Coffee", d));
        }
        let prediction = predictor.predict(
            &goal(600_000.0, 100_000.0, 40_000.0, (2027, 2, 1)),
            &history,
            400_000.0,
            0.0,
            as_of(),
        );
        assert!(prediction
            .acceleration_opportunities
            .iter()
            .any(|o| o.action.contains("Rent")));
        for opp in &prediction.acceleration_opportunities {
            assert!(opp.days_saved > MIN_DAYS_SAVED);
            assert_eq!(opp.confidence, 0.7);
        }
    }

    #[test]
    fn test_predict_many_covers_all_goals() {
        let kb = KnowledgeBase::load_default().unwrap();
        let predictor = GoalPredictor::new(&kb);
        let goals = vec![
            goal(600_000.0, 100_000.0, 40_000.0, (2027, 2, 1)),
            {
                let mut g = goal(200_000.0, 50_000.0, 20_000.0, (2026, 10, 1));
                g.name = "Laptop".to_string();
                g
            },
        ];
        let predictions = predictor.predict_many(&goals, &[], 400_000.0, as_of());
        assert_eq!(predictions.len(), 2);
        assert!(predictions.contains_key("Emergency Fund"));
        assert!(predictions.contains_key("Laptop"));
    }
}
