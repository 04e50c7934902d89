//! Fluxcast Core Library
//!
//! Predictive analytics for the Fluxcast personal finance tool:
//! - Knowledge base of trained artifacts (priors, lexicons, robust stats)
//! - Transaction feature extraction
//! - Categorization scoring with a confidence decision ladder
//! - Tiered robust-statistics anomaly detection
//! - Spending forecasts with trend and seasonality
//! - Seeded Monte Carlo goal-completion prediction
//! - Budget allocation suggestions scaled to an allocatable ceiling
//!
//! Everything here is pure, synchronous, in-memory computation. Ingestion
//! (file parsing, date filtering) lives in the CLI crate.

pub mod allocator;
pub mod anomaly;
pub mod categorizer;
pub mod engine;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod goals;
pub mod knowledge;
pub mod models;
pub mod stats;

pub use allocator::BudgetAllocator;
pub use anomaly::AnomalyDetector;
pub use categorizer::{CategorizeRequest, Categorizer, FALLBACK_CATEGORY};
pub use engine::Engine;
pub use error::{Error, Result};
pub use features::{FeatureExtractor, FeatureVector, Hint, SizeBucket};
pub use forecaster::{ForecastRequest, Forecaster};
pub use goals::GoalPredictor;
pub use knowledge::{CategoryStats, KnowledgeBase};
pub use models::{
    AllocationRecommendation, AnomalyResult, BudgetAllocation, CategorizationResult,
    CorrectionAck, DashboardInsights, DataQuality, Goal, GoalPrediction, Pod, RiskLevel,
    Severity, SpendingForecast, SuccessLikelihood, Transaction, Trend, TxType,
};
