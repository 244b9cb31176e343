use crate::domain::payment::{Payment, PaymentStatusUpdate};
use crate::domain::payment_method::PaymentMethod;
use crate::domain::ports::{PaymentMethodRepository, PaymentRepository, RefundRepository};
use crate::domain::refund::{RefundRequest, RefundStatusUpdate};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for payment methods.
///
/// Uses `Arc<RwLock<HashMap<Uuid, PaymentMethod>>>` to allow shared concurrent access.
/// Ideal for testing or small datasets where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryPaymentMethodStore {
    methods: Arc<RwLock<HashMap<Uuid, PaymentMethod>>>,
}

impl InMemoryPaymentMethodStore {
    /// Creates a new, empty in-memory payment method store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentMethodRepository for InMemoryPaymentMethodStore {
    async fn create_payment_method(&self, method: PaymentMethod) -> Result<()> {
        let mut methods = self.methods.write().await;
        methods.insert(method.id, method);
        Ok(())
    }

    async fn get_payment_method(&self, id: Uuid) -> Result<Option<PaymentMethod>> {
        let methods = self.methods.read().await;
        Ok(methods.get(&id).cloned())
    }

    async fn get_user_payment_methods(&self, user_id: &str) -> Result<Vec<PaymentMethod>> {
        let methods = self.methods.read().await;
        let mut found: Vec<PaymentMethod> = methods
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.created_at);
        Ok(found)
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<PaymentMethod>> {
        let methods = self.methods.read().await;
        Ok(methods
            .values()
            .find(|m| m.fingerprint == fingerprint)
            .cloned())
    }

    async fn set_default_payment_method(&self, user_id: &str, method_id: Uuid) -> Result<()> {
        let mut methods = self.methods.write().await;
        match methods.get(&method_id) {
            Some(m) if m.user_id == user_id => {}
            _ => return Err(PaymentError::not_found("Payment method", method_id)),
        }

        let now = Utc::now();
        for method in methods.values_mut().filter(|m| m.user_id == user_id) {
            let is_default = method.id == method_id;
            if method.is_default != is_default {
                method.is_default = is_default;
                method.updated_at = now;
            }
        }
        Ok(())
    }
}

/// A thread-safe in-memory store for payments.
///
/// Status updates run under the write lock, so two updates for the same
/// payment never interleave and stale transitions are rejected.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<Uuid, Payment>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentStore {
    async fn create_payment(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        payments.insert(payment.id, payment);
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(&id).cloned())
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        update: PaymentStatusUpdate,
    ) -> Result<Payment> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| PaymentError::not_found("Payment", id))?;
        payment.apply(update)?;
        Ok(payment.clone())
    }

    async fn get_payments_by_user(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut found: Vec<Payment> = payments
            .values()
            .filter(|p| p.payer_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_payments_by_trip(&self, trip_id: &str) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut found: Vec<Payment> = payments
            .values()
            .filter(|p| p.trip_id == trip_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.created_at);
        Ok(found)
    }

    async fn find_by_idempotency_key(
        &self,
        payer_id: &str,
        key: &str,
    ) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .find(|p| p.payer_id == payer_id && p.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn get_payments_by_idempotency_key(&self, key: &str) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut found: Vec<Payment> = payments
            .values()
            .filter(|p| p.idempotency_key.as_deref() == Some(key))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.created_at);
        Ok(found)
    }
}

/// A thread-safe in-memory store for refunds.
#[derive(Default, Clone)]
pub struct InMemoryRefundStore {
    refunds: Arc<RwLock<HashMap<Uuid, RefundRequest>>>,
}

impl InMemoryRefundStore {
    /// Creates a new, empty in-memory refund store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefundRepository for InMemoryRefundStore {
    async fn create_refund(&self, refund: RefundRequest) -> Result<()> {
        let mut refunds = self.refunds.write().await;
        refunds.insert(refund.id, refund);
        Ok(())
    }

    async fn get_refund(&self, id: Uuid) -> Result<Option<RefundRequest>> {
        let refunds = self.refunds.read().await;
        Ok(refunds.get(&id).cloned())
    }

    async fn update_refund_status(
        &self,
        id: Uuid,
        update: RefundStatusUpdate,
    ) -> Result<RefundRequest> {
        let mut refunds = self.refunds.write().await;
        let refund = refunds
            .get_mut(&id)
            .ok_or_else(|| PaymentError::not_found("Refund", id))?;
        refund.finish(update)?;
        Ok(refund.clone())
    }

    async fn get_refunds_by_payment(&self, payment_id: Uuid) -> Result<Vec<RefundRequest>> {
        let refunds = self.refunds.read().await;
        let mut found: Vec<RefundRequest> = refunds
            .values()
            .filter(|r| r.payment_id == payment_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }
}
