use ridepay::domain::payment::{Amount, Payment, PaymentStatus, PaymentStatusUpdate};
use ridepay::domain::payment_method::{PaymentMethod, PaymentMethodType};
use ridepay::domain::ports::{PaymentMethodRepositoryRef, PaymentRepositoryRef, RefundRepositoryRef};
use ridepay::domain::refund::{RefundRequest, RefundStatus, RefundStatusUpdate};
use ridepay::infrastructure::in_memory::{
    InMemoryPaymentMethodStore, InMemoryPaymentStore, InMemoryRefundStore,
};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let method_store: PaymentMethodRepositoryRef = Arc::new(InMemoryPaymentMethodStore::new());
    let payment_store: PaymentRepositoryRef = Arc::new(InMemoryPaymentStore::new());
    let refund_store: RefundRepositoryRef = Arc::new(InMemoryRefundStore::new());

    let method = PaymentMethod::new("rider-1".to_string(), PaymentMethodType::Cash, HashMap::new());
    let payment = Payment::new(
        "trip-1".to_string(),
        "rider-1".to_string(),
        "driver-1".to_string(),
        Amount::new(dec!(30)).unwrap(),
        "USD".to_string(),
        method.id,
        PaymentMethodType::Cash,
    );
    let refund = RefundRequest::new(
        payment.id,
        Amount::new(dec!(10)).unwrap(),
        "detour".to_string(),
        "support-1".to_string(),
    );
    let (method_id, payment_id, refund_id) = (method.id, payment.id, refund.id);

    // Verify Send + Sync by spawning tasks
    let ms_handle = tokio::spawn(async move {
        method_store.create_payment_method(method).await.unwrap();
        method_store.get_payment_method(method_id).await.unwrap().unwrap()
    });

    let ps_handle = tokio::spawn(async move {
        payment_store.create_payment(payment).await.unwrap();
        payment_store
            .update_payment_status(payment_id, PaymentStatusUpdate::new(PaymentStatus::Processing))
            .await
            .unwrap()
    });

    let rs_handle = tokio::spawn(async move {
        refund_store.create_refund(refund).await.unwrap();
        refund_store
            .update_refund_status(refund_id, RefundStatusUpdate::completed("ok"))
            .await
            .unwrap()
    });

    assert_eq!(ms_handle.await.unwrap().user_id, "rider-1");
    assert_eq!(ps_handle.await.unwrap().status, PaymentStatus::Processing);
    assert_eq!(rs_handle.await.unwrap().status, RefundStatus::Completed);
}

#[tokio::test]
async fn test_terminal_refund_is_final() {
    let refund_store: RefundRepositoryRef = Arc::new(InMemoryRefundStore::new());
    let refund = RefundRequest::new(
        uuid::Uuid::new_v4(),
        Amount::new(dec!(10)).unwrap(),
        "detour".to_string(),
        "support-1".to_string(),
    );
    let id = refund.id;
    refund_store.create_refund(refund).await.unwrap();

    refund_store
        .update_refund_status(id, RefundStatusUpdate::failed("declined"))
        .await
        .unwrap();
    assert!(
        refund_store
            .update_refund_status(id, RefundStatusUpdate::completed("late approval"))
            .await
            .is_err()
    );
    let stored = refund_store.get_refund(id).await.unwrap().unwrap();
    assert_eq!(stored.status, RefundStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("declined"));
}
