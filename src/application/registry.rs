use crate::config::ProcessorProfile;
use crate::domain::payment_method::{PaymentMethodType, ProcessorKind};
use crate::domain::ports::PaymentProcessorRef;
use crate::infrastructure::processors::{
    BankTransferProcessor, CardProcessor, CashProcessor, DigitalWalletProcessor,
};
use std::collections::HashMap;
use std::sync::Arc;

/// The processor backends an orchestrator may route to, keyed by
/// [`ProcessorKind`]. Built once and handed to the orchestrator.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<ProcessorKind, PaymentProcessorRef>,
}

impl ProcessorRegistry {
    /// An empty registry; every payment fails as unsupported until backends
    /// are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// All four simulated backends, each built from `profile(kind)`.
    pub fn simulated(profile: impl Fn(ProcessorKind) -> ProcessorProfile) -> Self {
        Self::new()
            .register(Arc::new(CardProcessor::new(profile(ProcessorKind::Card))))
            .register(Arc::new(DigitalWalletProcessor::new(profile(
                ProcessorKind::Wallet,
            ))))
            .register(Arc::new(BankTransferProcessor::new(profile(
                ProcessorKind::Bank,
            ))))
            .register(Arc::new(CashProcessor::new(profile(ProcessorKind::Cash))))
    }

    /// Registers `processor` under its own kind, replacing any previous one.
    pub fn register(mut self, processor: PaymentProcessorRef) -> Self {
        self.processors.insert(processor.kind(), processor);
        self
    }

    pub fn get(&self, method_type: PaymentMethodType) -> Option<PaymentProcessorRef> {
        self.processors.get(&method_type.processor_kind()).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProcessorKind> + '_ {
        self.processors.keys().copied()
    }
}
