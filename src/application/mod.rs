//! Application layer containing the core business logic orchestration.
//!
//! [`PaymentOrchestrator`](orchestrator::PaymentOrchestrator) is the entry
//! point for payments, refunds and payment-method registration. It owns no
//! storage itself: stores, the fraud detector and the processor registry are
//! injected at construction.

pub mod fraud;
pub mod locks;
pub mod orchestrator;
pub mod registry;
