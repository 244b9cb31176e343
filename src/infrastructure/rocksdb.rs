use crate::domain::payment::{Payment, PaymentStatusUpdate};
use crate::domain::payment_method::PaymentMethod;
use crate::domain::ports::{PaymentMethodRepository, PaymentRepository, RefundRepository};
use crate::domain::refund::{RefundRequest, RefundStatusUpdate};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for registered payment methods.
pub const CF_PAYMENT_METHODS: &str = "payment_methods";
/// Column Family for payment records.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for refund records.
pub const CF_REFUNDS: &str = "refunds";

/// A persistent store implementation using RocksDB.
///
/// Payment methods, payments and refunds live in separate Column Families,
/// keyed by the record's UUID bytes and stored as JSON. Secondary lookups
/// (by user, trip, fingerprint or idempotency key) scan the family.
///
/// Read-modify-write operations are serialized through `write_lock` so a
/// status update always sees the latest stored record.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// three column families when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_PAYMENT_METHODS, CF_PAYMENTS, CF_REFUNDS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                "Column family '{}' not found",
                name
            ))))
        })
    }

    fn put<T: Serialize>(&self, family: &str, id: Uuid, value: &T) -> Result<()> {
        let cf = self.cf(family)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, id.as_bytes(), bytes)?;
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, family: &str, id: Uuid) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every record in `family` for which `keep` returns true.
    fn scan<T, F>(&self, family: &str, mut keep: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: FnMut(&T) -> bool,
    {
        let cf = self.cf(family)?;
        let mut found = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: T = serde_json::from_slice(&value)?;
            if keep(&record) {
                found.push(record);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl PaymentMethodRepository for RocksDBStore {
    async fn create_payment_method(&self, method: PaymentMethod) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put(CF_PAYMENT_METHODS, method.id, &method)
    }

    async fn get_payment_method(&self, id: Uuid) -> Result<Option<PaymentMethod>> {
        self.load(CF_PAYMENT_METHODS, id)
    }

    async fn get_user_payment_methods(&self, user_id: &str) -> Result<Vec<PaymentMethod>> {
        let mut found: Vec<PaymentMethod> =
            self.scan(CF_PAYMENT_METHODS, |m: &PaymentMethod| m.user_id == user_id)?;
        found.sort_by_key(|m| m.created_at);
        Ok(found)
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<PaymentMethod>> {
        Ok(self
            .scan(CF_PAYMENT_METHODS, |m: &PaymentMethod| {
                m.fingerprint == fingerprint
            })?
            .into_iter()
            .next())
    }

    async fn set_default_payment_method(&self, user_id: &str, method_id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let methods: Vec<PaymentMethod> =
            self.scan(CF_PAYMENT_METHODS, |m: &PaymentMethod| m.user_id == user_id)?;
        if !methods.iter().any(|m| m.id == method_id) {
            return Err(PaymentError::not_found("Payment method", method_id));
        }

        let cf = self.cf(CF_PAYMENT_METHODS)?;
        let now = Utc::now();
        let mut batch = WriteBatch::default();
        for mut method in methods {
            let is_default = method.id == method_id;
            if method.is_default != is_default {
                method.is_default = is_default;
                method.updated_at = now;
                batch.put_cf(cf, method.id.as_bytes(), serde_json::to_vec(&method)?);
            }
        }
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for RocksDBStore {
    async fn create_payment(&self, payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put(CF_PAYMENTS, payment.id, &payment)
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        self.load(CF_PAYMENTS, id)
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        update: PaymentStatusUpdate,
    ) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let mut payment: Payment = self
            .load(CF_PAYMENTS, id)?
            .ok_or_else(|| PaymentError::not_found("Payment", id))?;
        payment.apply(update)?;
        self.put(CF_PAYMENTS, id, &payment)?;
        Ok(payment)
    }

    async fn get_payments_by_user(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Payment>> {
        let mut found: Vec<Payment> =
            self.scan(CF_PAYMENTS, |p: &Payment| p.payer_id == user_id)?;
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found.into_iter().skip(offset).take(limit).collect())
    }

    async fn get_payments_by_trip(&self, trip_id: &str) -> Result<Vec<Payment>> {
        let mut found: Vec<Payment> = self.scan(CF_PAYMENTS, |p: &Payment| p.trip_id == trip_id)?;
        found.sort_by_key(|p| p.created_at);
        Ok(found)
    }

    async fn find_by_idempotency_key(
        &self,
        payer_id: &str,
        key: &str,
    ) -> Result<Option<Payment>> {
        Ok(self
            .scan(CF_PAYMENTS, |p: &Payment| {
                p.payer_id == payer_id && p.idempotency_key.as_deref() == Some(key)
            })?
            .into_iter()
            .next())
    }

    async fn get_payments_by_idempotency_key(&self, key: &str) -> Result<Vec<Payment>> {
        let mut found: Vec<Payment> = self.scan(CF_PAYMENTS, |p: &Payment| {
            p.idempotency_key.as_deref() == Some(key)
        })?;
        found.sort_by_key(|p| p.created_at);
        Ok(found)
    }
}

#[async_trait]
impl RefundRepository for RocksDBStore {
    async fn create_refund(&self, refund: RefundRequest) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put(CF_REFUNDS, refund.id, &refund)
    }

    async fn get_refund(&self, id: Uuid) -> Result<Option<RefundRequest>> {
        self.load(CF_REFUNDS, id)
    }

    async fn update_refund_status(
        &self,
        id: Uuid,
        update: RefundStatusUpdate,
    ) -> Result<RefundRequest> {
        let _guard = self.write_lock.lock().await;
        let mut refund: RefundRequest = self
            .load(CF_REFUNDS, id)?
            .ok_or_else(|| PaymentError::not_found("Refund", id))?;
        refund.finish(update)?;
        self.put(CF_REFUNDS, id, &refund)?;
        Ok(refund)
    }

    async fn get_refunds_by_payment(&self, payment_id: Uuid) -> Result<Vec<RefundRequest>> {
        let mut found: Vec<RefundRequest> =
            self.scan(CF_REFUNDS, |r: &RefundRequest| r.payment_id == payment_id)?;
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }
}
