//! Knowledge base - static trained artifacts
//!
//! Immutable lookup tables standing in for a real model's learned
//! parameters: per-category priors, keyword lexicons (hand-curated base +
//! dataset-trained), token/n-gram weights, robust per-category statistics,
//! seasonal multipliers, trained monthly averages, income-bracket savings
//! rates, budget shares, and the brand-override table.
//!
//! The default bundle ships embedded in the binary and is parsed once at
//! startup; callers may substitute their own bundle via [`KnowledgeBase::from_json`].
//! Everything here is read-only for the life of the process.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Default artifacts bundle, regenerated by the offline training pipeline
const DEFAULT_BUNDLE: &str = include_str!("../artifacts/knowledge.json");

/// Categories whose transactions are income-typed; everything else is
/// expense-typed. Used for the category/type consistency penalty.
const INCOME_CATEGORIES: &[&str] = &["Income", "Savings"];

/// Robust statistics for one category's amount distribution
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryStats {
    pub median: f64,
    pub mad: f64,
    #[serde(default)]
    pub p90: Option<f64>,
    #[serde(default)]
    pub p95: Option<f64>,
    #[serde(default)]
    pub p97: Option<f64>,
    #[serde(default)]
    pub p98: Option<f64>,
    pub count: usize,
}

impl CategoryStats {
    /// Best-available upper percentile threshold, preferring the tighter
    /// tail: p98 → p97 → p95 → p90.
    pub fn best_percentile(&self) -> Option<(f64, &'static str)> {
        if let Some(p) = self.p98 {
            Some((p, "p98"))
        } else if let Some(p) = self.p97 {
            Some((p, "p97"))
        } else if let Some(p) = self.p95 {
            Some((p, "p95"))
        } else {
            self.p90.map(|p| (p, "p90"))
        }
    }
}

/// Scoring weights for one category's hint features and size buckets
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HintWeights {
    /// Hint-flag key (see `features::Hint::as_str`) → weight
    #[serde(default)]
    pub hints: HashMap<String, f64>,
    /// Weight applied to the normalized amount (amount / 100,000 capped at 1)
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub is_small: f64,
    #[serde(default)]
    pub is_medium: f64,
    #[serde(default)]
    pub is_large: f64,
}

/// A brand name that maps straight to a category
#[derive(Debug, Clone, Deserialize)]
pub struct BrandOverride {
    /// Lowercase substring matched against normalized transaction text
    pub pattern: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Bundle {
    category_priors: HashMap<String, f64>,
    base_keywords: HashMap<String, Vec<String>>,
    trained_keywords: HashMap<String, Vec<String>>,
    token_weights: HashMap<String, HashMap<String, f64>>,
    category_stats: HashMap<String, CategoryStats>,
    seasonal_factors: HashMap<String, HashMap<u32, f64>>,
    monthly_averages: HashMap<String, f64>,
    savings_rates: HashMap<String, f64>,
    budget_shares: HashMap<String, f64>,
    brand_overrides: Vec<BrandOverride>,
    hint_weights: HashMap<String, HintWeights>,
}

/// The loaded, validated knowledge base
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    bundle: Bundle,
    /// Sorted union of every category any table knows about. Sorted so
    /// scoring iterates in a deterministic order.
    categories: Vec<String>,
}

impl KnowledgeBase {
    /// Load the embedded default bundle
    pub fn load_default() -> Result<Self> {
        Self::from_json(DEFAULT_BUNDLE)
    }

    /// Load a caller-supplied bundle
    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: Bundle = serde_json::from_str(json)?;
        Self::validate(&bundle)?;

        let mut categories: Vec<String> = bundle
            .category_priors
            .keys()
            .chain(bundle.hint_weights.keys())
            .chain(bundle.base_keywords.keys())
            .chain(bundle.trained_keywords.keys())
            .chain(bundle.token_weights.keys())
            .cloned()
            .collect();
        categories.sort();
        categories.dedup();

        debug!(
            categories = categories.len(),
            overrides = bundle.brand_overrides.len(),
            "knowledge base loaded"
        );

        Ok(Self { bundle, categories })
    }

    fn validate(bundle: &Bundle) -> Result<()> {
        if bundle.category_priors.is_empty() {
            return Err(Error::Knowledge("category_priors is empty".into()));
        }
        for (category, prior) in &bundle.category_priors {
            if !prior.is_finite() || *prior < 0.0 {
                return Err(Error::Knowledge(format!(
                    "invalid prior {} for category {}",
                    prior, category
                )));
            }
        }
        for (category, months) in &bundle.seasonal_factors {
            for month in months.keys() {
                if !(1..=12).contains(month) {
                    return Err(Error::Knowledge(format!(
                        "seasonal month {} out of range for category {}",
                        month, category
                    )));
                }
            }
        }
        Ok(())
    }

    /// All known categories, sorted
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Trained prior probability, with a floor so log-scoring stays finite
    pub fn prior(&self, category: &str) -> f64 {
        self.bundle
            .category_priors
            .get(category)
            .copied()
            .unwrap_or(1e-6)
            .max(1e-6)
    }

    pub fn base_keywords(&self, category: &str) -> &[String] {
        self.bundle
            .base_keywords
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn trained_keywords(&self, category: &str) -> &[String] {
        self.bundle
            .trained_keywords
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn token_weights(&self, category: &str) -> Option<&HashMap<String, f64>> {
        self.bundle.token_weights.get(category)
    }

    pub fn stats(&self, category: &str) -> Option<&CategoryStats> {
        self.bundle.category_stats.get(category)
    }

    /// Trained seasonal multiplier for the category/month, if any
    pub fn seasonal_factor(&self, category: &str, month: u32) -> Option<f64> {
        self.bundle
            .seasonal_factors
            .get(category)
            .and_then(|m| m.get(&month))
            .copied()
    }

    /// Trained monthly spending average for the category, if any
    pub fn monthly_average(&self, category: &str) -> Option<f64> {
        self.bundle.monthly_averages.get(category).copied()
    }

    /// Trained savings rate for an annual income, by bracket
    pub fn savings_rate(&self, annual_income: f64) -> f64 {
        if !annual_income.is_finite() || annual_income <= 0.0 {
            return 0.0;
        }
        let bracket = if annual_income < 20_000.0 {
            "<20k"
        } else if annual_income < 50_000.0 {
            "20-50k"
        } else if annual_income < 100_000.0 {
            "50-100k"
        } else if annual_income < 200_000.0 {
            "100-200k"
        } else if annual_income < 500_000.0 {
            "200-500k"
        } else {
            "500k+"
        };
        self.bundle.savings_rates.get(bracket).copied().unwrap_or(0.0)
    }

    pub fn budget_shares(&self) -> &HashMap<String, f64> {
        &self.bundle.budget_shares
    }

    /// First brand override whose pattern occurs in the normalized text
    pub fn brand_override(&self, text: &str) -> Option<&BrandOverride> {
        self.bundle
            .brand_overrides
            .iter()
            .find(|o| text.contains(o.pattern.as_str()))
    }

    pub fn hint_weights(&self, category: &str) -> Option<&HintWeights> {
        self.bundle.hint_weights.get(category)
    }

    /// Whether transactions in this category are income-typed
    pub fn is_income_category(&self, category: &str) -> bool {
        INCOME_CATEGORIES.contains(&category)
    }
}
