//! Engine facade
//!
//! Owns the knowledge base and the current session snapshot (transaction
//! history plus monthly income) and dispatches to the scoring components.
//! The snapshot is replaced wholesale by [`Engine::initialize`] and is
//! read-only during every query, so concurrent callers holding their own
//! engines never observe partial state.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;

use crate::allocator::BudgetAllocator;
use crate::anomaly::AnomalyDetector;
use crate::categorizer::{CategorizeRequest, Categorizer};
use crate::error::Result;
use crate::features::FeatureExtractor;
use crate::forecaster::{ForecastRequest, Forecaster};
use crate::goals::GoalPredictor;
use crate::knowledge::KnowledgeBase;
use crate::models::{
    AllocationRecommendation, AnomalyResult, BudgetAllocation, CategorizationResult,
    CategoryShare, CorrectionAck, DashboardInsights, Goal, GoalPrediction, Pod, SpendingForecast,
    Transaction, TxType,
};

pub struct Engine {
    kb: KnowledgeBase,
    extractor: FeatureExtractor,
    history: Vec<Transaction>,
    monthly_income: f64,
}

impl Engine {
    /// Build an engine around a knowledge bundle with an empty snapshot
    pub fn new(kb: KnowledgeBase) -> Result<Self> {
        Ok(Self {
            kb,
            extractor: FeatureExtractor::new()?,
            history: Vec::new(),
            monthly_income: 0.0,
        })
    }

    /// Build an engine with the embedded default knowledge bundle
    pub fn with_default_knowledge() -> Result<Self> {
        Self::new(KnowledgeBase::load_default()?)
    }

    /// Atomically replace the session snapshot. Never merges.
    pub fn initialize(&mut self, history: Vec<Transaction>, monthly_income: f64) {
        info!(
            transactions = history.len(),
            monthly_income, "session snapshot replaced"
        );
        self.history = history;
        self.monthly_income = monthly_income;
    }

    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    pub fn monthly_income(&self) -> f64 {
        self.monthly_income
    }

    pub fn categorize(
        &self,
        description: &str,
        amount: f64,
        merchant: Option<&str>,
        tx_type: Option<TxType>,
    ) -> CategorizationResult {
        Categorizer::new(&self.kb, &self.extractor).categorize(
            &CategorizeRequest {
                description,
                amount,
                merchant,
                tx_type,
            },
            &self.history,
        )
    }

    pub fn detect_anomaly(&self, transaction: &Transaction) -> AnomalyResult {
        AnomalyDetector::new(&self.kb).detect(transaction, &self.history)
    }

    pub fn detect_anomalies(&self, transactions: &[Transaction]) -> Vec<AnomalyResult> {
        AnomalyDetector::new(&self.kb).detect_batch(transactions, &self.history)
    }

    pub fn forecast_spending(
        &self,
        category: &str,
        allocated: f64,
        spent: f64,
        period_days: f64,
        as_of: NaiveDate,
    ) -> SpendingForecast {
        Forecaster::new(&self.kb).forecast(
            &ForecastRequest {
                category,
                allocated,
                spent,
                period_days,
                as_of,
            },
            &self.history,
        )
    }

    pub fn predict_goal(
        &self,
        goal: &Goal,
        active_goals: &[Goal],
        as_of: NaiveDate,
    ) -> GoalPrediction {
        let total: f64 = active_goals.iter().map(|g| g.monthly_contribution).sum();
        let others = (total - goal.monthly_contribution).max(0.0);
        GoalPredictor::new(&self.kb).predict(
            goal,
            &self.history,
            self.monthly_income,
            others,
            as_of,
        )
    }

    pub fn predict_goals(
        &self,
        goals: &[Goal],
        as_of: NaiveDate,
    ) -> HashMap<String, GoalPrediction> {
        GoalPredictor::new(&self.kb).predict_many(goals, &self.history, self.monthly_income, as_of)
    }

    pub fn suggest_budget_allocation(
        &self,
        available_budget: f64,
        active_goals: &[Goal],
    ) -> AllocationRecommendation {
        let goal_contributions: f64 = active_goals.iter().map(|g| g.monthly_contribution).sum();
        BudgetAllocator::new(&self.kb).allocate(
            available_budget,
            &self.history,
            self.monthly_income,
            goal_contributions,
        )
    }

    pub fn suggest_new_pod_allocation(
        &self,
        pod_name: &str,
        available_budget: f64,
        existing_pods: &[Pod],
    ) -> Result<BudgetAllocation> {
        BudgetAllocator::new(&self.kb).new_pod_allocation(
            pod_name,
            available_budget,
            &self.history,
            existing_pods,
        )
    }

    /// Record a user correction of a categorization. Stub: the correction
    /// is logged for offline retraining, no weights change.
    pub fn learn_from_correction(
        &self,
        description: &str,
        predicted: &str,
        corrected: &str,
    ) -> CorrectionAck {
        Categorizer::new(&self.kb, &self.extractor).learn_from_correction(
            description,
            predicted,
            corrected,
        )
    }

    /// Simple reductions over the snapshot for the dashboard
    pub fn dashboard_insights(&self) -> DashboardInsights {
        let total_income: f64 = self
            .history
            .iter()
            .filter(|tx| tx.tx_type == TxType::Income)
            .map(|tx| tx.amount.abs())
            .sum();
        let total_spending: f64 = self
            .history
            .iter()
            .filter(|tx| tx.tx_type == TxType::Expense)
            .map(|tx| tx.amount.abs())
            .sum();
        let savings_rate_percent = if total_income > 0.0 {
            ((total_income - total_spending) / total_income * 100.0).round()
        } else {
            0.0
        };

        let mut totals: HashMap<&str, f64> = HashMap::new();
        for tx in self.history.iter().filter(|tx| tx.tx_type == TxType::Expense) {
            *totals.entry(tx.category.as_str()).or_default() += tx.amount.abs();
        }
        let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        let top_categories = ranked
            .into_iter()
            .take(5)
            .map(|(category, amount)| CategoryShare {
                category: category.to_string(),
                amount,
                percentage: if total_spending > 0.0 {
                    (amount / total_spending * 100.0).round()
                } else {
                    0.0
                },
            })
            .collect();

        DashboardInsights {
            total_income,
            total_spending,
            savings_rate_percent,
            transaction_count: self.history.len(),
            top_categories,
        }
    }
}
