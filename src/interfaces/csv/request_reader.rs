use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Payment,
    Refund,
}

/// One row of a request file.
///
/// For payments `reference` doubles as the idempotency key; for refunds it
/// names the payment being refunded (its reference or its id).
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct RequestRecord {
    pub r#type: RequestType,
    pub reference: String,
    pub user: String,
    #[serde(default)]
    pub trip: Option<String>,
    #[serde(default)]
    pub driver: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Country the trip started in, fed to the location factor.
    #[serde(default)]
    pub country: Option<String>,
}

/// Reads payment and refund requests from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<RequestRecord>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<RequestRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "type, reference, user, trip, driver, amount, currency, method, reason";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\npayment, ride-1, rider-1, trip-1, driver-1, 25.50, USD, rider-cash,\nrefund, ride-1, support-1, , , 5.00, , , driver no-show"
        );
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<RequestRecord>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        let payment = results[0].as_ref().unwrap();
        assert_eq!(payment.r#type, RequestType::Payment);
        assert_eq!(payment.amount, dec!(25.50));
        assert_eq!(payment.method.as_deref(), Some("rider-cash"));
        assert_eq!(payment.reason, None);

        let refund = results[1].as_ref().unwrap();
        assert_eq!(refund.r#type, RequestType::Refund);
        assert_eq!(refund.trip, None);
        assert_eq!(refund.reason.as_deref(), Some("driver no-show"));
    }

    #[test]
    fn test_reader_short_rows_use_defaults() {
        let data = format!("{HEADER}\nrefund, ride-1, support-1, , , 5.00");
        let reader = RequestReader::new(data.as_bytes());
        let record = reader.requests().next().unwrap().unwrap();
        assert_eq!(record.currency, None);
        assert_eq!(record.reason, None);
        assert_eq!(record.country, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{HEADER}\ntip, ride-1, rider-1, trip-1, driver-1, 1.0, USD, m,");
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<RequestRecord>> = reader.requests().collect();

        assert!(results[0].is_err());
    }
}
