//! Domain model: entities, value objects and the ports the core depends on.

pub mod fraud;
pub mod payment;
pub mod payment_method;
pub mod ports;
pub mod processor;
pub mod refund;
