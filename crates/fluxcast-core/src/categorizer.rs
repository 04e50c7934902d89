//! Transaction categorization scorer
//!
//! Combines the knowledge base, extracted features, and the user's own
//! history into a per-category score, converts scores to a probability
//! distribution, dampens the distribution by evidence/quality factors, and
//! applies a threshold ladder that decides between the top category and the
//! "Other" fallback bucket.
//!
//! The ladder constants below define the Other/real-category boundary for
//! arbitrary input text; unit tests pin them.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::features::{normalize_text, FeatureExtractor, SizeBucket};
use crate::knowledge::KnowledgeBase;
use crate::models::{
    CategorizationResult, CategoryAlternative, CorrectionAck, Transaction, TxType,
};
use crate::stats;

/// Fallback bucket for text the ladder refuses to classify
pub const FALLBACK_CATEGORY: &str = "Other";

/// Hard cap on every returned confidence
const MAX_CONFIDENCE: f64 = 0.9;

/// Confidence returned on a brand-override hit
const BRAND_OVERRIDE_CONFIDENCE: f64 = 0.85;

// Decision ladder floors. Each rung trades confidence for corroborating
// evidence: more keyword matches or an explicit spending verb lower the bar.
const ACCEPT_CONFIDENCE_FLOOR: f64 = 0.35;
const KEYWORD_CONFIDENCE_FLOOR: f64 = 0.22;
const VERB_CONFIDENCE_FLOOR: f64 = 0.15;

// Score accumulation weights
const MERCHANT_PATTERN_BONUS: f64 = 0.3;
const AMAZON_TECH_BONUS: f64 = 0.4;
const BASE_KEYWORD_WEIGHT: f64 = 0.35;
const TRAINED_KEYWORD_WEIGHT: f64 = 0.2;
const KEYWORD_MATCH_CAP: usize = 5;
const HISTORY_PRIOR_WEIGHT: f64 = 0.5;
const TRAINED_PRIOR_WEIGHT: f64 = 0.3;
const MERCHANT_AFFINITY_WEIGHT: f64 = 0.6;
const TOKEN_AFFINITY_WEIGHT: f64 = 0.3;
const TYPE_MISMATCH_PENALTY: f64 = 2.5;

// Amount heuristics (domain currency units)
const INCOME_AMOUNT_CUE: f64 = 50_000.0;
const TECH_AMOUNT_CUE: f64 = 20_000.0;
const COFFEE_AMOUNT_CUE: f64 = 1_000.0;
const AMOUNT_NORM_SCALE: f64 = 100_000.0;

// Dampening factors
const SMALL_HISTORY_MIN: usize = 5;
const SMALL_HISTORY_DISCOUNT: f64 = 0.85;
const EVIDENCE_BASE: f64 = 0.55;
const EVIDENCE_PER_SIGNAL: f64 = 0.15;
const QUALITY_WEIGHT_FLOOR: f64 = 0.7;
const IMBALANCE_THRESHOLD: f64 = 0.6;
const IMBALANCE_SLOPE: f64 = 0.5;

const SPENDING_VERBS: &[&str] = &["bought", "paid", "purchased", "spent", "ordered", "renewed"];

/// Cue words that mark a transaction as income when no expense cue fires
const INCOME_CUES: &[&str] = &[
    "salary", "payroll", "paycheck", "bonus", "dividend", "interest", "refund", "reversal",
    "income", "received", "earned", "stipend", "wage",
];

/// Cue words that mark a transaction as an expense
const EXPENSE_CUES: &[&str] = &[
    "bought", "paid", "purchase", "purchased", "spent", "ordered", "bill", "fee", "charge",
    "renewal", "subscription",
];

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "paid", "payment", "transfer",
    "transaction", "amount", "bill", "card", "bank", "debit", "credit", "monthly",
];

/// Categorization request with optional fields inferred when absent
#[derive(Debug, Clone)]
pub struct CategorizeRequest<'a> {
    pub description: &'a str,
    pub amount: f64,
    pub merchant: Option<&'a str>,
    pub tx_type: Option<TxType>,
}

pub struct Categorizer<'a> {
    kb: &'a KnowledgeBase,
    extractor: &'a FeatureExtractor,
}

impl<'a> Categorizer<'a> {
    pub fn new(kb: &'a KnowledgeBase, extractor: &'a FeatureExtractor) -> Self {
        Self { kb, extractor }
    }

    pub fn categorize(
        &self,
        req: &CategorizeRequest<'_>,
        history: &[Transaction],
    ) -> CategorizationResult {
        let amount = req.amount.abs();
        let text = normalize_text(req.description, req.merchant);
        let tx_type = req.tx_type.unwrap_or_else(|| infer_tx_type(&text));

        // Brand overrides short-circuit everything else, but only when the
        // caller actually supplied a merchant field.
        if let Some(merchant) = req.merchant {
            let merchant_lower = merchant.to_lowercase();
            if let Some(hit) = self.kb.brand_override(&merchant_lower) {
                debug!(merchant = %merchant, category = %hit.category, "brand override");
                return CategorizationResult {
                    category: hit.category.clone(),
                    confidence: BRAND_OVERRIDE_CONFIDENCE,
                    alternatives: Vec::new(),
                };
            }
        }

        let features = self.extractor.extract(&text, amount);
        let tokens = tokenize_with_bigrams(&text);
        let profile = HistoryProfile::build(history);
        let quality = stats::data_quality_score(history.len(), 20.0, profile.span_days);

        let categories = self.kb.categories();
        let mut scores: Vec<f64> = Vec::with_capacity(categories.len());
        let mut keyword_matches: Vec<usize> = Vec::with_capacity(categories.len());

        for category in categories {
            let mut score = 0.0;

            if let Some(w) = self.kb.hint_weights(category) {
                for hint in &features.hints {
                    score += w.hints.get(hint.as_str()).copied().unwrap_or(0.0);
                }
                score += w.amount * (amount / AMOUNT_NORM_SCALE).min(1.0);
                score += match features.bucket {
                    SizeBucket::Small => w.is_small,
                    SizeBucket::Medium => w.is_medium,
                    SizeBucket::Large => w.is_large,
                };
            }

            // Merchant-pattern bonus over the full text (the override table
            // doubles as the pattern list once the short-circuit has passed)
            if let Some(hit) = self.kb.brand_override(&text) {
                if hit.category == *category {
                    score += MERCHANT_PATTERN_BONUS;
                }
            }
            if category == "Tech" && text.contains("amazon") && amount > TECH_AMOUNT_CUE {
                score += AMAZON_TECH_BONUS;
            }

            // Amount heuristics
            if category == "Income" && amount > INCOME_AMOUNT_CUE {
                score += 0.5;
            }
            if category == "Tech" && amount > TECH_AMOUNT_CUE {
                score += 0.3;
            }
            if category == "Coffee" && amount < COFFEE_AMOUNT_CUE {
                score += 0.2;
            }

            // Laplace-smoothed log-prior from the user's own labels,
            // weighted by how much we trust the history
            if profile.total > 0 {
                let count = profile.category_counts.get(category).copied().unwrap_or(0);
                let p = (count as f64 + 1.0) / (profile.total as f64 + categories.len() as f64);
                score += HISTORY_PRIOR_WEIGHT * quality * p.ln();
            }

            // Trained prior carries the load while history is thin
            if profile.total < SMALL_HISTORY_MIN {
                score += TRAINED_PRIOR_WEIGHT * self.kb.prior(category).ln();
            }

            // Merchant affinity: how often this user's transactions with the
            // same merchant landed in this category
            if let Some(merchant) = req.merchant {
                let key = merchant.to_lowercase();
                if let Some((cat_count, total)) = profile.merchant_counts.get(&key).map(|m| {
                    (
                        m.get(category).copied().unwrap_or(0),
                        m.values().sum::<usize>(),
                    )
                }) {
                    if total > 0 {
                        score += MERCHANT_AFFINITY_WEIGHT * cat_count as f64 / total as f64;
                    }
                }
            }

            // Token affinity against the user's own descriptions
            if let Some(seen) = profile.category_tokens.get(category) {
                let overlap = tokens.iter().filter(|t| seen.contains(*t)).count();
                score += TOKEN_AFFINITY_WEIGHT * (overlap.min(4) as f64 / 4.0);
            }

            // Keyword lexicons, base and trained weighted separately
            let base_matches = count_keyword_matches(&text, self.kb.base_keywords(category));
            let trained_matches = count_keyword_matches(&text, self.kb.trained_keywords(category));
            score += BASE_KEYWORD_WEIGHT * base_matches as f64;
            score += TRAINED_KEYWORD_WEIGHT * trained_matches as f64;

            // Trained token/n-gram weights
            if let Some(weights) = self.kb.token_weights(category) {
                for token in &tokens {
                    score += weights.get(token).copied().unwrap_or(0.0);
                }
            }

            // Category/type consistency
            let category_is_income = self.kb.is_income_category(category);
            if category_is_income != (tx_type == TxType::Income) {
                score -= TYPE_MISMATCH_PENALTY;
            }

            scores.push(score);
            keyword_matches.push(base_matches + trained_matches);
        }

        let distribution = softmax(&scores);

        // Rank categories by probability, descending
        let mut order: Vec<usize> = (0..categories.len()).collect();
        order.sort_by(|a, b| {
            distribution[*b]
                .partial_cmp(&distribution[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let top = order[0];

        // Four independent dampening factors, applied uniformly so the
        // distribution mass stays <= 1
        let small_history = if profile.total < SMALL_HISTORY_MIN {
            SMALL_HISTORY_DISCOUNT
        } else {
            1.0
        };
        let signals = features.hints.len() + keyword_matches[top];
        let evidence = (EVIDENCE_BASE + EVIDENCE_PER_SIGNAL * signals as f64).min(1.0);
        let quality_weight = QUALITY_WEIGHT_FLOOR + (1.0 - QUALITY_WEIGHT_FLOOR) * quality;
        let imbalance = profile.imbalance_penalty();
        let damp = small_history * evidence * quality_weight * imbalance;

        let adjusted = (distribution[top] * damp).min(MAX_CONFIDENCE);
        let alternatives: Vec<CategoryAlternative> = order
            .iter()
            .skip(1)
            .take(3)
            .map(|&i| CategoryAlternative {
                category: categories[i].clone(),
                confidence: (distribution[i] * damp).clamp(0.0, 1.0),
            })
            .collect();

        let spending_verb = SPENDING_VERBS.iter().any(|v| text.contains(v));
        let top_matches = keyword_matches[top];
        let leads_all_runners = order
            .iter()
            .skip(1)
            .all(|&i| top_matches > keyword_matches[i]);

        let accepted = adjusted >= ACCEPT_CONFIDENCE_FLOOR
            || (top_matches >= 2 && adjusted >= KEYWORD_CONFIDENCE_FLOOR)
            || (spending_verb && top_matches >= 1 && adjusted >= VERB_CONFIDENCE_FLOOR)
            || (spending_verb && top_matches > 0 && leads_all_runners);

        if accepted {
            debug!(
                category = %categories[top],
                confidence = adjusted,
                "categorized"
            );
            return CategorizationResult {
                category: categories[top].clone(),
                confidence: adjusted,
                alternatives,
            };
        }

        // Fallback bucket absorbs the leftover probability mass, which keeps
        // confidence + sum(alternatives) bounded by 1
        let fallback_alternatives: Vec<CategoryAlternative> = order
            .iter()
            .take(3)
            .map(|&i| CategoryAlternative {
                category: categories[i].clone(),
                confidence: (distribution[i] * damp).clamp(0.0, 1.0),
            })
            .collect();
        let claimed: f64 = fallback_alternatives.iter().map(|a| a.confidence).sum();
        let fallback_confidence = (1.0 - claimed).clamp(0.0, MAX_CONFIDENCE);

        debug!(
            rejected = %categories[top],
            adjusted = adjusted,
            "below decision ladder, falling back"
        );
        CategorizationResult {
            category: FALLBACK_CATEGORY.to_string(),
            confidence: fallback_confidence,
            alternatives: fallback_alternatives,
        }
    }

    /// Learning hook. There is no model update loop; this records the
    /// correction in the log stream and acknowledges it.
    pub fn learn_from_correction(
        &self,
        description: &str,
        predicted: &str,
        corrected: &str,
    ) -> CorrectionAck {
        debug!(
            description = %description,
            predicted = %predicted,
            corrected = %corrected,
            "categorization correction recorded"
        );
        CorrectionAck {
            learned: true,
            message: format!(
                "Recorded correction from {} to {} for future retraining",
                predicted, corrected
            ),
        }
    }
}

/// Per-user history aggregates the scorer consumes
struct HistoryProfile {
    total: usize,
    span_days: f64,
    category_counts: HashMap<String, usize>,
    merchant_counts: HashMap<String, HashMap<String, usize>>,
    category_tokens: HashMap<String, HashSet<String>>,
}

impl HistoryProfile {
    fn build(history: &[Transaction]) -> Self {
        let mut category_counts: HashMap<String, usize> = HashMap::new();
        let mut merchant_counts: HashMap<String, HashMap<String, usize>> = HashMap::new();
        let mut category_tokens: HashMap<String, HashSet<String>> = HashMap::new();

        for tx in history {
            *category_counts.entry(tx.category.clone()).or_default() += 1;
            if let Some(merchant) = &tx.merchant {
                *merchant_counts
                    .entry(merchant.to_lowercase())
                    .or_default()
                    .entry(tx.category.clone())
                    .or_default() += 1;
            }
            let entry = category_tokens.entry(tx.category.clone()).or_default();
            for token in tokenize(&tx.description.to_lowercase()) {
                entry.insert(token);
            }
        }

        let dates: Vec<chrono::NaiveDate> = history.iter().map(|tx| tx.date).collect();
        Self {
            total: history.len(),
            span_days: stats::span_days(&dates),
            category_counts,
            merchant_counts,
            category_tokens,
        }
    }

    /// Confidence discount when one label dominates the user's history
    fn imbalance_penalty(&self) -> f64 {
        if self.total < SMALL_HISTORY_MIN {
            return 1.0;
        }
        let max_count = self.category_counts.values().copied().max().unwrap_or(0);
        let dominance = max_count as f64 / self.total as f64;
        1.0 - (dominance - IMBALANCE_THRESHOLD).max(0.0) * IMBALANCE_SLOPE
    }
}

fn infer_tx_type(text: &str) -> TxType {
    let income = INCOME_CUES.iter().any(|c| text.contains(c));
    let expense = EXPENSE_CUES.iter().any(|c| text.contains(c));
    if income && !expense {
        TxType::Income
    } else {
        TxType::Expense
    }
}

fn count_keyword_matches(text: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| text.contains(k.as_str()))
        .count()
        .min(KEYWORD_MATCH_CAP)
}

fn tokenize(text: &str) -> Vec<String> {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|t| t.len() > 2)
        .filter(|t| !t.chars().any(|c| c.is_ascii_digit()))
        .filter(|t| !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Tokens plus underscore-joined bigrams, matching the trained
/// token-weight table's key format
fn tokenize_with_bigrams(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let bigrams: Vec<String> = tokens
        .windows(2)
        .map(|pair| format!("{}_{}", pair[0], pair[1]))
        .collect();
    let mut all = tokens;
    all.extend(bigrams);
    all
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let max = scores.iter().cloned().fold(f64::MIN, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum <= 0.0 {
        return vec![1.0 / scores.len() as f64; scores.len()];
    }
    exps.iter().map(|e| e / sum).collect()
}
