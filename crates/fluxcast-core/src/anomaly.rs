//! Tiered anomaly detection over a transaction and its peer history
//!
//! Tier order (first match wins unless noted):
//! 1. Amount at 10x the same-type median flags high severity immediately.
//! 2. Under 10 total records only a hard amount limit flags.
//! 3. A category never seen before flags medium severity.
//! 4. 1-4 category records fall back to knowledge-base statistics.
//! 5. 5+ category records use statistics computed from the history itself,
//!    then duplicate and first-merchant checks may raise the severity.

use tracing::debug;

use crate::knowledge::KnowledgeBase;
use crate::models::{AnomalyResult, DataQuality, Severity, Transaction};
use crate::stats;

/// Hard flag limit used while total history is too thin for statistics.
/// Sized above the largest routine transaction in the training scale.
const LOW_HISTORY_HARD_LIMIT: f64 = 1_000_000.0;

/// Minimum total records before per-category statistics are trusted
const MIN_HISTORY_FOR_STATS: usize = 10;

/// Minimum category records before statistics come from the history
/// instead of the knowledge base
const MIN_CATEGORY_SAMPLES: usize = 5;

/// Same-type median multiple that always flags, regardless of category
const MEDIAN_RATIO_LIMIT: f64 = 10.0;

// Robust z-score tiers
const Z_HIGH: f64 = 3.0;
const Z_MEDIUM: f64 = 2.0;
const Z_LOW: f64 = 1.5;

/// Amount tolerance for the duplicate check, in currency units
const DUPLICATE_TOLERANCE: f64 = 10.0;

/// Category-mean multiple that makes a first-time merchant suspicious
const NEW_MERCHANT_MEAN_RATIO: f64 = 1.5;

pub struct AnomalyDetector<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    pub fn detect(&self, transaction: &Transaction, history: &[Transaction]) -> AnomalyResult {
        let amount = transaction.amount.abs();

        // Tier 1: extreme multiple of the same-type median. Runs before any
        // per-category logic so it fires even with no category history.
        let same_type_amounts: Vec<f64> = history
            .iter()
            .filter(|tx| tx.tx_type == transaction.tx_type)
            .map(|tx| tx.amount.abs())
            .collect();
        let type_median = stats::median(&same_type_amounts);
        if type_median > 0.0 && amount >= type_median * MEDIAN_RATIO_LIMIT {
            let ratio = amount / type_median;
            debug!(amount, type_median, ratio, "median-multiple anomaly");
            return result(
                true,
                (ratio / 20.0).min(1.0),
                format!(
                    "Amount is {:.0}x the median {} transaction",
                    ratio, transaction.tx_type
                ),
                Severity::High,
                data_quality(history.len()),
            );
        }

        // Tier 2: thin overall history
        if history.len() < MIN_HISTORY_FOR_STATS {
            if amount >= LOW_HISTORY_HARD_LIMIT {
                return result(
                    true,
                    0.8,
                    format!("Amount {:.0} exceeds the review limit", amount),
                    Severity::High,
                    DataQuality::Low,
                );
            }
            return result(
                false,
                0.0,
                "Insufficient historical data".to_string(),
                Severity::Low,
                DataQuality::Low,
            );
        }

        let category_tx: Vec<&Transaction> = history
            .iter()
            .filter(|tx| tx.category == transaction.category)
            .collect();

        // Tier 3: never-seen category
        if category_tx.is_empty() {
            return result(
                true,
                0.6,
                "Transaction in new category".to_string(),
                Severity::Medium,
                data_quality(history.len()),
            );
        }

        // Tier 4: a few category records, lean on the knowledge base
        if category_tx.len() < MIN_CATEGORY_SAMPLES {
            return match self.kb.stats(&transaction.category) {
                Some(kb_stats) => {
                    let z = stats::robust_z(amount, kb_stats.median, kb_stats.mad);
                    let percentile_hit = kb_stats
                        .best_percentile()
                        .filter(|(threshold, _)| amount > *threshold);
                    self.classify(
                        &transaction.category,
                        amount,
                        z,
                        percentile_hit,
                        false,
                        data_quality(category_tx.len()),
                    )
                }
                None => result(
                    false,
                    0.1,
                    format!("Too few {} records to judge", transaction.category),
                    Severity::Low,
                    DataQuality::Low,
                ),
            };
        }

        // Tier 5: enough category history to compute statistics directly
        let amounts: Vec<f64> = category_tx.iter().map(|tx| tx.amount.abs()).collect();
        let median = stats::median(&amounts);
        let mad = stats::mad(&amounts);
        let mean = stats::mean(&amounts);
        let z = stats::robust_z(amount, median, mad);
        let p98 = stats::percentile(&amounts, 98.0);
        let percentile_hit = (amount > p98).then_some((p98, "p98"));

        let mut outcome = self.classify(
            &transaction.category,
            amount,
            z,
            percentile_hit,
            true,
            data_quality(category_tx.len()),
        );

        // Duplicate raise: same day, category, and type within tolerance
        let duplicate = history.iter().any(|tx| {
            tx.date == transaction.date
                && tx.category == transaction.category
                && tx.tx_type == transaction.tx_type
                && (tx.amount.abs() - amount).abs() < DUPLICATE_TOLERANCE
        });
        if duplicate && outcome.severity < Severity::Medium {
            outcome.is_anomaly = true;
            outcome.severity = Severity::Medium;
            outcome.anomaly_score = outcome.anomaly_score.max(0.6);
            outcome.reason = "Possible duplicate transaction".to_string();
        }

        // First-merchant raise: unseen merchant spending well above the mean
        if let Some(merchant) = &transaction.merchant {
            let seen = history.iter().any(|tx| {
                tx.merchant
                    .as_deref()
                    .is_some_and(|m| m.eq_ignore_ascii_case(merchant))
            });
            if !seen && amount > mean * NEW_MERCHANT_MEAN_RATIO {
                if outcome.severity < Severity::Medium {
                    outcome.severity = Severity::Medium;
                    outcome.reason = format!("First transaction with {}", merchant);
                }
                outcome.is_anomaly = true;
                outcome.anomaly_score = outcome.anomaly_score.max(0.5);
            }
        }

        outcome.suggested_action = suggested_action(outcome.is_anomaly, outcome.severity);
        outcome
    }

    /// Map a batch of transactions through the detector
    pub fn detect_batch(
        &self,
        transactions: &[Transaction],
        history: &[Transaction],
    ) -> Vec<AnomalyResult> {
        transactions
            .iter()
            .map(|tx| self.detect(tx, history))
            .collect()
    }

    /// Shared z-score/percentile classification for tiers 4 and 5
    fn classify(
        &self,
        category: &str,
        amount: f64,
        z: f64,
        percentile_hit: Option<(f64, &'static str)>,
        with_low_tier: bool,
        quality: DataQuality,
    ) -> AnomalyResult {
        let (z_severity, z_score) = if z > Z_HIGH {
            (Some(Severity::High), (z / 5.0).min(1.0))
        } else if z > Z_MEDIUM {
            (Some(Severity::Medium), z / 4.0)
        } else if with_low_tier && z > Z_LOW {
            (Some(Severity::Low), z / 3.0)
        } else {
            (None, 0.0)
        };

        let percentile_severity = percentile_hit.map(|(threshold, label)| {
            let severity = if label == "p98" || label == "p97" {
                Severity::High
            } else {
                Severity::Medium
            };
            let score = (amount / (threshold * 2.0)).clamp(0.5, 1.0);
            (severity, score, label)
        });

        match (z_severity, percentile_severity) {
            (None, None) => result(
                false,
                (z / Z_HIGH).clamp(0.0, 0.4),
                format!("Amount is typical for {}", category),
                Severity::Low,
                quality,
            ),
            (Some(sev), None) => result(
                true,
                z_score,
                format!("Amount is {:.1} robust deviations from the {} median", z, category),
                sev,
                quality,
            ),
            (None, Some((sev, score, label))) => result(
                true,
                score,
                format!("Amount exceeds the {} {} threshold", category, label),
                sev,
                quality,
            ),
            (Some(z_sev), Some((p_sev, p_score, label))) => {
                let severity = z_sev.max(p_sev);
                result(
                    true,
                    z_score.max(p_score),
                    format!(
                        "Amount is {:.1} robust deviations out and beyond the {} {} threshold",
                        z, category, label
                    ),
                    severity,
                    quality,
                )
            }
        }
    }
}

fn result(
    is_anomaly: bool,
    score: f64,
    reason: String,
    severity: Severity,
    quality: DataQuality,
) -> AnomalyResult {
    AnomalyResult {
        is_anomaly,
        anomaly_score: score.clamp(0.0, 1.0),
        reason,
        severity,
        suggested_action: suggested_action(is_anomaly, severity),
        data_quality: quality,
    }
}

fn suggested_action(is_anomaly: bool, severity: Severity) -> Option<String> {
    if !is_anomaly {
        return None;
    }
    match severity {
        Severity::High => Some("Please verify this transaction is correct".to_string()),
        Severity::Medium => Some("Double-check this transaction".to_string()),
        Severity::Low => None,
    }
}

fn data_quality(samples: usize) -> DataQuality {
    if samples < 10 {
        DataQuality::Low
    } else if samples < 25 {
        DataQuality::Medium
    } else {
        DataQuality::High
    }
}
