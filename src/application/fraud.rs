use crate::config::FraudConfig;
use crate::domain::fraud::{FraudDetectionResult, RiskLevel, UserActivity};
use crate::domain::payment::Payment;
use crate::domain::ports::{FraudDetector, HistoryProviderRef};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Timelike;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::debug;

pub const FACTOR_AMOUNT: &str = "amount";
pub const FACTOR_TIME: &str = "time";
pub const FACTOR_VELOCITY: &str = "velocity";
pub const FACTOR_LOCATION: &str = "location";

/// Weighted four-factor fraud scorer.
///
/// The amount and time factors depend only on the payment. Velocity and
/// location come from the injected [`HistoryProvider`](crate::domain::ports::HistoryProvider),
/// so the engine holds no state of its own.
pub struct FraudEngine {
    history: HistoryProviderRef,
    config: FraudConfig,
}

impl FraudEngine {
    pub fn new(history: HistoryProviderRef, config: FraudConfig) -> Self {
        Self { history, config }
    }

    /// Scores a transaction from already-gathered activity.
    pub fn score(&self, payment: &Payment, activity: UserActivity) -> FraudDetectionResult {
        let cfg = &self.config;
        let w = &cfg.weights;

        let amount = amount_score(payment.amount.value());
        let time = time_score(payment.created_at.hour());
        let velocity = velocity_score(activity.recent_transactions, cfg.max_velocity_score);
        let location = location_score(activity.location_anomaly, cfg.max_location_score);

        let risk_score = (amount * w.amount
            + time * w.time
            + velocity * w.velocity
            + location * w.location)
            .clamp(0.0, 1.0);

        let risk_level = if risk_score >= cfg.high_threshold {
            RiskLevel::High
        } else if risk_score >= cfg.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let factors = BTreeMap::from([
            (FACTOR_AMOUNT.to_string(), amount),
            (FACTOR_TIME.to_string(), time),
            (FACTOR_VELOCITY.to_string(), velocity),
            (FACTOR_LOCATION.to_string(), location),
        ]);

        let reasons = [
            (amount, "High transaction amount"),
            (time, "Unusual transaction time"),
            (velocity, "High transaction velocity"),
            (location, "Unusual transaction location"),
        ]
        .into_iter()
        .filter(|(score, _)| *score > cfg.reason_threshold)
        .map(|(_, reason)| reason.to_string())
        .collect();

        FraudDetectionResult {
            transaction_id: payment.id,
            risk_score,
            risk_level,
            factors,
            reasons,
            requires_manual_review: risk_level != RiskLevel::Low,
        }
    }
}

#[async_trait]
impl FraudDetector for FraudEngine {
    async fn analyze_transaction(&self, payment: &Payment) -> Result<FraudDetectionResult> {
        let activity = self.history.recent_activity(payment).await?;
        let result = self.score(payment, activity);
        debug!(
            payment_id = %payment.id,
            risk_score = result.risk_score,
            risk_level = %result.risk_level,
            "fraud analysis complete"
        );
        Ok(result)
    }
}

/// Step function of the amount: larger charges score higher.
pub fn amount_score(amount: Decimal) -> f64 {
    if amount > dec!(1000) {
        0.9
    } else if amount > dec!(500) {
        0.7
    } else if amount > dec!(100) {
        0.4
    } else {
        0.1
    }
}

/// Late-night hours (UTC) score higher: 02-05 highest, 22-01 moderate.
pub fn time_score(hour: u32) -> f64 {
    match hour {
        2..=5 => 0.8,
        22 | 23 | 0 | 1 => 0.5,
        _ => 0.1,
    }
}

pub fn velocity_score(recent_transactions: u32, ceiling: f64) -> f64 {
    (f64::from(recent_transactions) * 0.1).min(ceiling)
}

pub fn location_score(anomaly: f64, ceiling: f64) -> f64 {
    (anomaly.clamp(0.0, 1.0) * ceiling).min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FactorWeights;
    use crate::domain::payment::Amount;
    use crate::domain::payment_method::PaymentMethodType;
    use crate::domain::ports::HistoryProvider;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use uuid::Uuid;

    struct FixedHistory(UserActivity);

    #[async_trait]
    impl HistoryProvider for FixedHistory {
        async fn recent_activity(&self, _payment: &Payment) -> Result<UserActivity> {
            Ok(self.0)
        }
    }

    fn payment_at(amount: Decimal, hour: u32) -> Payment {
        let mut p = Payment::new(
            "trip-1".to_string(),
            "rider-1".to_string(),
            "driver-1".to_string(),
            Amount::new(amount).unwrap(),
            "USD".to_string(),
            Uuid::new_v4(),
            PaymentMethodType::CreditCard,
        );
        p.created_at = Utc.with_ymd_and_hms(2026, 3, 14, hour, 15, 0).unwrap();
        p
    }

    fn engine(activity: UserActivity) -> FraudEngine {
        FraudEngine::new(Arc::new(FixedHistory(activity)), FraudConfig::default())
    }

    #[test]
    fn test_amount_score_is_monotonic() {
        let amounts = [dec!(5), dec!(100), dec!(100.01), dec!(500.01), dec!(1000.01)];
        let scores: Vec<f64> = amounts.iter().map(|a| amount_score(*a)).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(amount_score(dec!(1500)), 0.9);
        assert_eq!(amount_score(dec!(50)), 0.1);
    }

    #[test]
    fn test_time_score_bands() {
        assert_eq!(time_score(3), 0.8);
        assert_eq!(time_score(23), 0.5);
        assert_eq!(time_score(1), 0.5);
        assert_eq!(time_score(14), 0.1);
    }

    #[test]
    fn test_history_factors_are_capped() {
        assert_eq!(velocity_score(100, 0.6), 0.6);
        assert!((velocity_score(2, 0.6) - 0.2).abs() < 1e-9);
        assert_eq!(location_score(7.0, 0.5), 0.5);
        assert_eq!(location_score(-1.0, 0.5), 0.0);
    }

    #[tokio::test]
    async fn test_quiet_daytime_ride_is_low_risk() {
        let result = engine(UserActivity::default())
            .analyze_transaction(&payment_at(dec!(25.50), 14))
            .await
            .unwrap();

        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(!result.requires_manual_review);
        assert!(result.reasons.is_empty());
        assert_eq!(result.factors.len(), 4);
        // 0.1*0.3 + 0.1*0.2
        assert!((result.risk_score - 0.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_large_late_night_burst_is_medium_with_reasons() {
        let activity = UserActivity {
            recent_transactions: 10,
            location_anomaly: 1.0,
        };
        let result = engine(activity)
            .analyze_transaction(&payment_at(dec!(2000), 3))
            .await
            .unwrap();

        // 0.9*0.3 + 0.8*0.2 + 0.6*0.3 + 0.5*0.2 = 0.71
        assert!((result.risk_score - 0.71).abs() < 1e-9);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.requires_manual_review);
        assert_eq!(
            result.reasons,
            vec![
                "High transaction amount".to_string(),
                "Unusual transaction time".to_string()
            ]
        );
    }

    #[test]
    fn test_custom_weights_can_reach_high() {
        let config = FraudConfig {
            weights: FactorWeights {
                amount: 0.6,
                time: 0.4,
                velocity: 0.0,
                location: 0.0,
            },
            ..FraudConfig::default()
        };
        let engine = FraudEngine::new(
            Arc::new(FixedHistory(UserActivity::default())),
            config,
        );
        let result = engine.score(&payment_at(dec!(2000), 4), UserActivity::default());
        // 0.9*0.6 + 0.8*0.4 = 0.86
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.requires_manual_review);
    }
}
