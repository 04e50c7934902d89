//! Domain models for Fluxcast

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Income,
    Expense,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial transaction. Immutable input unit for all engine queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub description: String,
    /// Currency magnitude, always non-negative
    pub amount: f64,
    pub merchant: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub date: NaiveDate,
}

/// A savings goal to evaluate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub monthly_contribution: f64,
    pub deadline: NaiveDate,
}

/// Heuristic confidence in the underlying sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Low,
    Medium,
    High,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for DataQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown data quality: {}", s)),
        }
    }
}

impl std::fmt::Display for DataQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anomaly severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Budget risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spending trend direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bucketed goal-completion likelihood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessLikelihood {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl SuccessLikelihood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryHigh => "very-high",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::VeryLow => "very-low",
        }
    }

    /// Bucket a completion probability at the 0.9/0.75/0.5/0.25 cut points
    pub fn from_probability(p: f64) -> Self {
        if p >= 0.9 {
            Self::VeryHigh
        } else if p >= 0.75 {
            Self::High
        } else if p >= 0.5 {
            Self::Medium
        } else if p >= 0.25 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

impl std::fmt::Display for SuccessLikelihood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An alternative category candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAlternative {
    pub category: String,
    pub confidence: f64,
}

/// Result of categorizing a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationResult {
    pub category: String,
    pub confidence: f64,
    /// Up to 3 runner-up candidates
    pub alternatives: Vec<CategoryAlternative>,
}

/// Result of anomaly detection on a single transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    /// 0-1, higher = more anomalous
    pub anomaly_score: f64,
    pub reason: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    pub data_quality: DataQuality,
}

/// Numeric confidence interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AmountInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Date confidence interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateInterval {
    pub lower: NaiveDate,
    pub upper: NaiveDate,
}

/// Spending projection for a category over a budget period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingForecast {
    pub predicted_amount: f64,
    pub confidence_interval: AmountInterval,
    pub trend: Trend,
    /// 0-1 magnitude of the trend change
    pub trend_strength: f64,
    pub seasonal_factor: f64,
    pub days_until_depletion: f64,
    pub depletion_date: NaiveDate,
    pub risk_level: RiskLevel,
    pub data_quality: DataQuality,
}

/// A suggested way to finish a goal sooner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelerationOpportunity {
    pub action: String,
    pub days_saved: f64,
    pub confidence: f64,
}

/// Goal-completion prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalPrediction {
    pub completion_probability: f64,
    pub predicted_completion_date: NaiveDate,
    pub confidence_interval: DateInterval,
    pub recommended_contribution: f64,
    pub risk_factors: Vec<String>,
    pub success_likelihood: SuccessLikelihood,
    pub months_to_complete: f64,
    pub acceleration_opportunities: Vec<AccelerationOpportunity>,
    pub data_quality: DataQuality,
}

/// A single category allocation suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub category: String,
    pub suggested_amount: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub min_amount: f64,
    pub max_amount: f64,
}

/// Full allocation recommendation across categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRecommendation {
    pub allocations: Vec<BudgetAllocation>,
    pub total_suggested: f64,
    pub expected_savings: f64,
    pub risk_assessment: RiskLevel,
}

/// A named budget envelope with an allocated amount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
    pub allocated: f64,
}

/// Share of spending attributed to one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Aggregate dashboard figures over the session snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardInsights {
    pub total_income: f64,
    pub total_spending: f64,
    /// Rounded percentage of income kept
    pub savings_rate_percent: f64,
    pub transaction_count: usize,
    pub top_categories: Vec<CategoryShare>,
}

/// Acknowledgement returned by the learn-from-correction hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionAck {
    pub learned: bool,
    pub message: String,
}
