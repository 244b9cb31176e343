//! Sources of payer history for the fraud engine's velocity and location
//! factors.

use crate::domain::fraud::UserActivity;
use crate::domain::payment::Payment;
use crate::domain::ports::{HistoryProvider, PaymentRepositoryRef};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use rand::Rng;
use std::time::Duration;

/// Metadata key carrying the ISO country the trip started in.
pub const COUNTRY_METADATA_KEY: &str = "country";

/// Random activity, for running without any history store.
#[derive(Debug, Default, Clone)]
pub struct SimulatedHistory;

#[async_trait]
impl HistoryProvider for SimulatedHistory {
    async fn recent_activity(&self, _payment: &Payment) -> Result<UserActivity> {
        let mut rng = rand::thread_rng();
        Ok(UserActivity {
            recent_transactions: rng.gen_range(0..=6),
            location_anomaly: rng.gen_range(0.0..=1.0),
        })
    }
}

/// Activity derived from the payer's stored payments.
///
/// Velocity counts the payer's other payments created within `window` of
/// this one. A location anomaly is reported when this payment's country
/// differs from the one on the payer's most recent earlier payment.
pub struct RecordedHistory {
    payments: PaymentRepositoryRef,
    window: Duration,
    lookback: usize,
}

impl RecordedHistory {
    pub fn new(payments: PaymentRepositoryRef, window: Duration) -> Self {
        Self {
            payments,
            window,
            lookback: 50,
        }
    }
}

#[async_trait]
impl HistoryProvider for RecordedHistory {
    async fn recent_activity(&self, payment: &Payment) -> Result<UserActivity> {
        let window = ChronoDuration::from_std(self.window).unwrap_or(ChronoDuration::hours(1));
        let since = payment.created_at - window;

        let history: Vec<Payment> = self
            .payments
            .get_payments_by_user(&payment.payer_id, self.lookback, 0)
            .await?
            .into_iter()
            .filter(|p| p.id != payment.id && p.created_at <= payment.created_at)
            .collect();

        let recent_transactions = history.iter().filter(|p| p.created_at >= since).count() as u32;

        let current = payment.metadata.get(COUNTRY_METADATA_KEY);
        let previous = history
            .iter()
            .max_by_key(|p| p.created_at)
            .and_then(|p| p.metadata.get(COUNTRY_METADATA_KEY));
        let location_anomaly = match (current, previous) {
            (Some(now), Some(before)) if !now.eq_ignore_ascii_case(before) => 1.0,
            _ => 0.0,
        };

        Ok(UserActivity {
            recent_transactions,
            location_anomaly,
        })
    }
}
