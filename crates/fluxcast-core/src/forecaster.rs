//! Category spending forecasts
//!
//! Projects monthly spending for a category from winsorized history,
//! classifies the recent trend, applies trained seasonal multipliers, and
//! estimates when the allocated budget runs out. All date arithmetic is
//! anchored on an explicit `as_of` date so the projection is deterministic.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use crate::knowledge::KnowledgeBase;
use crate::models::{
    AmountInterval, DataQuality, RiskLevel, SpendingForecast, Transaction, Trend, TxType,
};
use crate::stats;

/// Trend change below this fraction is treated as stable
const TREND_THRESHOLD: f64 = 0.1;
/// Trend adjustment caps on the monthly projection
const TREND_INCREASE_CAP: f64 = 0.3;
const TREND_DECREASE_CAP: f64 = -0.2;
/// Transactions needed before any trend is reported
const MIN_TREND_SAMPLES: usize = 6;
/// Window size for the recent/previous trend comparison
const TREND_WINDOW: usize = 5;

/// Default seasonal bumps used when the trained table has no entry
fn default_seasonal_factor(month: u32) -> f64 {
    match month {
        12 => 1.15,
        1 => 1.10,
        10 => 1.05,
        _ => 1.0,
    }
}

/// Forecast request for one category over a budget period
#[derive(Debug, Clone)]
pub struct ForecastRequest<'a> {
    pub category: &'a str,
    pub allocated: f64,
    pub spent: f64,
    pub period_days: f64,
    pub as_of: NaiveDate,
}

pub struct Forecaster<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> Forecaster<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    pub fn forecast(&self, req: &ForecastRequest<'_>, history: &[Transaction]) -> SpendingForecast {
        let period_days = if req.period_days > 0.0 {
            req.period_days
        } else {
            30.0
        };
        let allocated = req.allocated.max(0.0);
        let spent = req.spent.abs();

        let category_tx: Vec<&Transaction> = history
            .iter()
            .filter(|tx| tx.category == req.category && tx.tx_type == TxType::Expense)
            .collect();

        if category_tx.is_empty() {
            return self.forecast_without_history(req, allocated, spent, period_days);
        }

        // Winsorized amounts tame outliers before any aggregate
        let raw_amounts: Vec<f64> = category_tx.iter().map(|tx| tx.amount.abs()).collect();
        let amounts = stats::winsorize(&raw_amounts);
        let average_transaction = stats::mean(&amounts);

        let dates: Vec<NaiveDate> = category_tx.iter().map(|tx| tx.date).collect();
        let time_span = stats::span_days(&dates);
        let transactions_per_day = category_tx.len() as f64 / time_span;
        let quality_score = stats::data_quality_score(category_tx.len(), 12.0, time_span);
        let quality = if category_tx.len() >= 12 && time_span >= 60.0 {
            DataQuality::High
        } else if category_tx.len() >= 6 {
            DataQuality::Medium
        } else {
            DataQuality::Low
        };

        let base_monthly = average_transaction * transactions_per_day * 30.0;

        // Trend from the last five vs the preceding five transactions
        let (trend, trend_change) = self.classify_trend(&category_tx);
        let mut predicted = base_monthly;
        match trend {
            Trend::Increasing => predicted *= 1.0 + trend_change.min(TREND_INCREASE_CAP),
            Trend::Decreasing => predicted *= 1.0 + trend_change.max(TREND_DECREASE_CAP),
            Trend::Stable => {}
        }

        let month = req.as_of.month();
        let seasonal_factor = self
            .kb
            .seasonal_factor(req.category, month)
            .unwrap_or_else(|| default_seasonal_factor(month));
        predicted *= seasonal_factor;

        // Thin data pulls the projection toward what was actually spent
        if quality_score < 0.7 {
            predicted = predicted * quality_score + spent * (1.0 - quality_score);
        }

        let std_dev = stats::std_dev(&amounts);
        let uncertainty_boost = if quality_score < 0.6 {
            1.25
        } else if quality_score < 0.8 {
            1.10
        } else {
            1.0
        };
        let margin = std_dev * 1.96 * uncertainty_boost;

        let predicted = predicted.max(0.0);
        let lower = (predicted - margin).max(0.0);
        let upper = (predicted + margin).max(lower);

        let remaining = allocated - spent;
        let daily = predicted / 30.0;
        let depletion_days = if daily > 0.0 {
            (remaining / daily).max(0.0)
        } else {
            period_days
        };

        debug!(
            category = req.category,
            predicted, ?trend, seasonal_factor, "forecast"
        );

        SpendingForecast {
            predicted_amount: predicted,
            confidence_interval: AmountInterval { lower, upper },
            trend,
            trend_strength: trend_change.abs().min(1.0),
            seasonal_factor,
            days_until_depletion: depletion_days,
            depletion_date: add_days(req.as_of, depletion_days),
            risk_level: risk_level(allocated, spent, depletion_days),
            data_quality: quality,
        }
    }

    /// Forecast several categories in one pass
    pub fn forecast_many(
        &self,
        requests: &[ForecastRequest<'_>],
        history: &[Transaction],
    ) -> Vec<SpendingForecast> {
        requests
            .iter()
            .map(|req| self.forecast(req, history))
            .collect()
    }

    fn forecast_without_history(
        &self,
        req: &ForecastRequest<'_>,
        allocated: f64,
        spent: f64,
        period_days: f64,
    ) -> SpendingForecast {
        // Trained monthly average stands in for the user's own history;
        // failing that, the current period's spend is the best guess
        let fallback_monthly = match self.kb.monthly_average(req.category) {
            Some(avg) if avg > 0.0 => avg,
            _ => spent,
        };
        let daily = if fallback_monthly > 0.0 {
            fallback_monthly / period_days
        } else {
            0.0
        };
        let remaining = allocated - spent;
        let depletion_days = if daily > 0.0 {
            (remaining / daily).max(0.0)
        } else {
            period_days
        };
        let month = req.as_of.month();
        let seasonal_factor = self.kb.seasonal_factor(req.category, month).unwrap_or(1.0);

        SpendingForecast {
            predicted_amount: fallback_monthly.max(0.0),
            confidence_interval: AmountInterval {
                lower: (fallback_monthly * 0.8).max(0.0),
                upper: (fallback_monthly * 1.2).max(0.0),
            },
            trend: Trend::Stable,
            trend_strength: 0.0,
            seasonal_factor,
            days_until_depletion: depletion_days,
            depletion_date: add_days(req.as_of, depletion_days),
            risk_level: RiskLevel::Medium,
            data_quality: DataQuality::Low,
        }
    }

    fn classify_trend(&self, category_tx: &[&Transaction]) -> (Trend, f64) {
        if category_tx.len() < MIN_TREND_SAMPLES {
            return (Trend::Stable, 0.0);
        }

        let mut sorted: Vec<&Transaction> = category_tx.to_vec();
        sorted.sort_by_key(|tx| tx.date);

        let recent: Vec<f64> = sorted
            .iter()
            .rev()
            .take(TREND_WINDOW)
            .map(|tx| tx.amount.abs())
            .collect();
        let older: Vec<f64> = sorted
            .iter()
            .rev()
            .skip(TREND_WINDOW)
            .take(TREND_WINDOW)
            .map(|tx| tx.amount.abs())
            .collect();

        let recent_avg = stats::mean(&recent);
        let older_avg = if older.is_empty() {
            recent_avg
        } else {
            stats::mean(&older)
        };
        if older_avg <= 0.0 {
            return (Trend::Stable, 0.0);
        }

        let change = (recent_avg - older_avg) / older_avg;
        if change > TREND_THRESHOLD {
            (Trend::Increasing, change)
        } else if change < -TREND_THRESHOLD {
            (Trend::Decreasing, change)
        } else {
            (Trend::Stable, change)
        }
    }
}

fn risk_level(allocated: f64, spent: f64, depletion_days: f64) -> RiskLevel {
    let utilization = if allocated > 0.0 {
        spent / allocated
    } else {
        0.0
    };
    if utilization > 0.8 || depletion_days < 7.0 {
        RiskLevel::High
    } else if utilization < 0.5 && depletion_days > 20.0 {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    }
}

fn add_days(date: NaiveDate, days: f64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days.round().max(0.0) as i64))
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: f64, category: &str, day: u32) -> Transaction {
        Transaction {
            description: format!("{} purchase", category),
            amount,
            merchant: None,
            category: category.to_string(),
            tx_type: TxType::Expense,
            date: NaiveDate::from_ymd_opt(2026, 3, day.clamp(1, 28)).unwrap(),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 28).unwrap()
    }

    fn request<'a>(category: &'a str, allocated: f64, spent: f64) -> ForecastRequest<'a> {
        ForecastRequest {
            category,
            allocated,
            spent,
            period_days: 30.0,
            as_of: as_of(),
        }
    }

    #[test]
    fn test_empty_history_uses_trained_average() {
        let kb = KnowledgeBase::load_default().unwrap();
        let forecaster = Forecaster::new(&kb);
        let forecast = forecaster.forecast(&request("Coffee", 20_000.0, 2_000.0), &[]);
        assert!(forecast.predicted_amount >= 0.0);
        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.trend_strength, 0.0);
        assert_eq!(forecast.data_quality, DataQuality::Low);
        assert!(forecast.days_until_depletion >= 0.0);
    }

    #[test]
    fn test_unknown_category_without_history_falls_back_to_spent() {
        let kb = KnowledgeBase::load_default().unwrap();
        let forecaster = Forecaster::new(&kb);
        let forecast = forecaster.forecast(&request("Zeppelins", 10_000.0, 3_000.0), &[]);
        assert_eq!(forecast.predicted_amount, 3_000.0);
        assert_eq!(forecast.seasonal_factor, 1.0);
    }

    #[test]
    fn test_steady_history_projects_monthly_rate() {
        let kb = KnowledgeBase::load_default().unwrap();
        let forecaster = Forecaster::new(&kb);
        // 14 transactions of 5,000 over 27 days: ~5,185/day pace
        let history: Vec<Transaction> = (1..=14).map(|d| tx(5_000.0, "Food", d * 2)).collect();
        let forecast = forecaster.forecast(&request("Food", 200_000.0, 60_000.0), &history);
        assert!(forecast.predicted_amount > 0.0);
        assert_eq!(forecast.trend, Trend::Stable);
        assert!(forecast.confidence_interval.lower <= forecast.predicted_amount);
        assert!(forecast.confidence_interval.upper >= forecast.predicted_amount);
    }

    #[test]
    fn test_rising_history_reports_increasing_trend() {
        let kb = KnowledgeBase::load_default().unwrap();
        let forecaster = Forecaster::new(&kb);
        let mut history = Vec::new();
        for d in 1..=5 {
            history.push(tx(2_000.0, "Transport", d));
        }
        for d in 6..=10 {
            history.push(tx(4_000.0, "Transport", d));
        }
        let forecast = forecaster.forecast(&request("Transport", 100_000.0, 10_000.0), &history);
        assert_eq!(forecast.trend, Trend::Increasing);
        assert!(forecast.trend_strength > TREND_THRESHOLD);
        assert!(forecast.trend_strength <= 1.0);
    }

    #[test]
    fn test_trend_forced_stable_below_six_samples() {
        let kb = KnowledgeBase::load_default().unwrap();
        let forecaster = Forecaster::new(&kb);
        let history = vec![
            tx(1_000.0, "Coffee", 1),
            tx(1_500.0, "Coffee", 5),
            tx(2_500.0, "Coffee", 9),
            tx(4_000.0, "Coffee", 13),
            tx(6_000.0, "Coffee", 17),
        ];
        let forecast = forecaster.forecast(&request("Coffee", 50_000.0, 5_000.0), &history);
        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.trend_strength, 0.0);
    }

    #[test]
    fn test_depletion_never_negative() {
        let kb = KnowledgeBase::load_default().unwrap();
        let forecaster = Forecaster::new(&kb);
        // Overspent allocation
        let history: Vec<Transaction> = (1..=10).map(|d| tx(9_000.0, "Shopping", d * 2)).collect();
        let forecast = forecaster.forecast(&request("Shopping", 10_000.0, 50_000.0), &history);
        assert!(forecast.days_until_depletion >= 0.0);
        assert_eq!(forecast.risk_level, RiskLevel::High);
        assert!(forecast.depletion_date >= as_of());
    }

    #[test]
    fn test_low_utilization_is_low_risk() {
        let kb = KnowledgeBase::load_default().unwrap();
        let forecaster = Forecaster::new(&kb);
        // Modest spend against a huge allocation
        let history: Vec<Transaction> = (1..=12).map(|d| tx(1_000.0, "Coffee", d * 2)).collect();
        let forecast = forecaster.forecast(&request("Coffee", 500_000.0, 10_000.0), &history);
        assert_eq!(forecast.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_forecast_many_aligns_with_singles() {
        let kb = KnowledgeBase::load_default().unwrap();
        let forecaster = Forecaster::new(&kb);
        let history: Vec<Transaction> = (1..=10).map(|d| tx(2_000.0, "Coffee", d)).collect();
        let requests = vec![request("Coffee", 80_000.0, 8_000.0), request("Food", 100_000.0, 0.0)];
        let many = forecaster.forecast_many(&requests, &history);
        assert_eq!(many.len(), 2);
        let single = forecaster.forecast(&requests[0], &history);
        assert_eq!(many[0].predicted_amount, single.predicted_amount);
    }
}
