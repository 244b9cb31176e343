use crate::application::orchestrator::{PaymentResponse, RefundResponse};
use crate::domain::fraud::RiskLevel;
use crate::error::Result;
use crate::interfaces::csv::request_reader::RequestType;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

/// One output row per processed request.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct OutcomeRecord {
    pub r#type: &'static str,
    pub reference: String,
    pub success: bool,
    pub payment: Option<Uuid>,
    pub status: Option<String>,
    pub risk: Option<RiskLevel>,
    pub fee: Option<Decimal>,
    pub message: String,
}

impl OutcomeRecord {
    pub fn from_payment(reference: String, response: &PaymentResponse) -> Self {
        let payment = response.payment.as_ref();
        Self {
            r#type: type_name(RequestType::Payment),
            reference,
            success: response.success,
            payment: payment.map(|p| p.id),
            status: payment.map(|p| p.status.to_string()),
            risk: payment.and_then(|p| p.risk_level),
            fee: payment.and_then(|p| p.processing_fee),
            message: response.message.clone(),
        }
    }

    pub fn from_refund(reference: String, response: &RefundResponse) -> Self {
        Self {
            r#type: type_name(RequestType::Refund),
            reference,
            success: response.success,
            payment: response.payment.as_ref().map(|p| p.id),
            status: response.refund.as_ref().map(|r| r.status.to_string()),
            risk: None,
            fee: None,
            message: response.message.clone(),
        }
    }
}

fn type_name(kind: RequestType) -> &'static str {
    match kind {
        RequestType::Payment => "payment",
        RequestType::Refund => "refund",
    }
}

/// Writes [`OutcomeRecord`]s as CSV, header first.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_outcome(&mut self, outcome: &OutcomeRecord) -> Result<()> {
        self.writer.serialize(outcome)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_emits_header_and_rows() {
        let mut buf = Vec::new();
        {
            let mut writer = OutcomeWriter::new(&mut buf);
            writer
                .write_outcome(&OutcomeRecord {
                    r#type: "payment",
                    reference: "ride-1".to_string(),
                    success: false,
                    payment: None,
                    status: None,
                    risk: None,
                    fee: None,
                    message: "Payment method not found".to_string(),
                })
                .unwrap();
            writer.flush().unwrap();
        }
        let out = String::from_utf8(buf).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("type,reference,success,payment,status,risk,fee,message")
        );
        assert_eq!(
            lines.next(),
            Some("payment,ride-1,false,,,,,Payment method not found")
        );
    }
}
