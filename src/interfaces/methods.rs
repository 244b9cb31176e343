use crate::application::orchestrator::AddPaymentMethodRequest;
use crate::error::Result;
use serde::Deserialize;
use std::io::Read;

/// A payment method to register, named so request rows can refer to it.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct MethodEntry {
    pub label: String,
    #[serde(flatten)]
    pub request: AddPaymentMethodRequest,
}

/// Reads a JSON array of [`MethodEntry`].
pub fn read_methods<R: Read>(source: R) -> Result<Vec<MethodEntry>> {
    Ok(serde_json::from_reader(source)?)
}
