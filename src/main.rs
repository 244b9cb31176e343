use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use ridepay::application::fraud::FraudEngine;
use ridepay::application::orchestrator::{
    PaymentOrchestrator, ProcessPaymentRequest, ProcessRefundRequest,
};
use ridepay::application::registry::ProcessorRegistry;
use ridepay::config::{OrchestratorConfig, ProcessorProfile, RefundPolicy};
use ridepay::domain::payment_method::fingerprint;
use ridepay::domain::ports::{
    HistoryProviderRef, PaymentMethodRepositoryRef, PaymentRepositoryRef, RefundRepositoryRef,
};
use ridepay::infrastructure::history::{COUNTRY_METADATA_KEY, RecordedHistory, SimulatedHistory};
use ridepay::infrastructure::in_memory::{
    InMemoryPaymentMethodStore, InMemoryPaymentStore, InMemoryRefundStore,
};
use ridepay::interfaces::csv::outcome_writer::{OutcomeRecord, OutcomeWriter};
use ridepay::interfaces::csv::request_reader::{RequestReader, RequestRecord, RequestType};
use ridepay::interfaces::methods::read_methods;
use ridepay::telemetry::init_tracing;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HistorySource {
    /// Random velocity and location signals.
    Simulated,
    /// Signals derived from payments already processed in this run.
    Recorded,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input requests CSV file
    input: PathBuf,

    /// JSON file of payment methods to register before processing
    #[arg(long, env = "RIDEPAY_METHODS")]
    methods: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "RIDEPAY_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Largest accepted payment amount
    #[arg(long, env = "RIDEPAY_MAX_AMOUNT", default_value = "5000")]
    max_amount: Decimal,

    /// Floor for estimated processing fees
    #[arg(long, env = "RIDEPAY_MIN_FEE", default_value = "0.30")]
    min_fee: Decimal,

    /// Processor call timeout in milliseconds
    #[arg(long, env = "RIDEPAY_TIMEOUT_MS", default_value_t = 5000)]
    timeout_ms: u64,

    /// What a full refund does to the original payment
    #[arg(long, env = "RIDEPAY_REFUND_POLICY", value_enum, default_value_t = RefundPolicy::KeepOriginal)]
    refund_policy: RefundPolicy,

    /// Where the fraud engine gets payer history from
    #[arg(long, env = "RIDEPAY_HISTORY", value_enum, default_value_t = HistorySource::Recorded)]
    history: HistorySource,

    /// Disable simulated latency, declines and verification failures
    #[arg(long)]
    no_simulation: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "RIDEPAY_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

struct Stores {
    methods: PaymentMethodRepositoryRef,
    payments: PaymentRepositoryRef,
    refunds: RefundRepositoryRef,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            methods: Arc::new(InMemoryPaymentMethodStore::new()),
            payments: Arc::new(InMemoryPaymentStore::new()),
            refunds: Arc::new(InMemoryRefundStore::new()),
        }
    }

    fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let Some(db_path) = db_path else {
            return Ok(Self::in_memory());
        };

        #[cfg(feature = "storage-rocksdb")]
        {
            let store = ridepay::infrastructure::rocksdb::RocksDBStore::open(&db_path)
                .into_diagnostic()?;
            info!(path = %db_path.display(), "using RocksDB storage");
            Ok(Self {
                methods: Arc::new(store.clone()),
                payments: Arc::new(store.clone()),
                refunds: Arc::new(store),
            })
        }

        #[cfg(not(feature = "storage-rocksdb"))]
        {
            warn!(
                path = %db_path.display(),
                "Persistent storage requested, but the 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
            Ok(Self::in_memory())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let stores = Stores::open(cli.db_path)?;

    let config = OrchestratorConfig {
        max_payment_amount: cli.max_amount,
        minimum_fee: cli.min_fee,
        processor_timeout: Duration::from_millis(cli.timeout_ms),
        refund_policy: cli.refund_policy,
        ..OrchestratorConfig::default()
    };

    let history: HistoryProviderRef = match cli.history {
        HistorySource::Simulated => Arc::new(SimulatedHistory),
        HistorySource::Recorded => Arc::new(RecordedHistory::new(
            stores.payments.clone(),
            config.fraud.velocity_window,
        )),
    };
    let fraud = Arc::new(FraudEngine::new(history, config.fraud.clone()));

    let no_simulation = cli.no_simulation;
    let processors = ProcessorRegistry::simulated(|kind| {
        let profile = ProcessorProfile::for_kind(kind);
        if no_simulation {
            profile.deterministic()
        } else {
            profile
        }
    });
    info!(
        processors = ?processors.kinds().collect::<Vec<_>>(),
        simulated = !no_simulation,
        "processor backends registered"
    );

    let orchestrator = PaymentOrchestrator::new(
        stores.methods,
        stores.payments,
        stores.refunds,
        fraud,
        processors,
        config,
    );

    // Register payment methods
    let mut labels = HashMap::new();
    if let Some(path) = cli.methods {
        let file = File::open(path).into_diagnostic()?;
        for entry in read_methods(file).into_diagnostic()? {
            let fingerprint = fingerprint(
                entry.request.method_type,
                &entry.request.user_id,
                &entry.request.details,
            );
            let user_id = entry.request.user_id.clone();
            let response = orchestrator
                .add_payment_method(entry.request)
                .await
                .into_diagnostic()?;
            if let Some(method) = response.method {
                labels.insert(entry.label, method.id);
                continue;
            }

            // Methods persisted by an earlier run keep their id
            let stored = orchestrator
                .get_user_payment_methods(&user_id)
                .await
                .into_diagnostic()?
                .into_iter()
                .find(|m| m.fingerprint == fingerprint);
            match stored {
                Some(method) => {
                    info!(label = %entry.label, method_id = %method.id, "payment method already stored");
                    labels.insert(entry.label, method.id);
                }
                None => warn!(
                    label = %entry.label,
                    message = %response.message,
                    errors = ?response.errors,
                    "payment method not registered"
                ),
            }
        }
    }

    info!(registered = labels.len(), "payment methods loaded");

    // Process requests
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());
    for request in reader.requests() {
        match request {
            Ok(record) => match process_request(&orchestrator, &labels, record).await {
                Ok(outcome) => writer.write_outcome(&outcome).into_diagnostic()?,
                Err(e) => error!(error = %e, "Error processing request"),
            },
            Err(e) => error!(error = %e, "Error reading request"),
        }
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}

async fn process_request(
    orchestrator: &PaymentOrchestrator,
    labels: &HashMap<String, Uuid>,
    record: RequestRecord,
) -> ridepay::error::Result<OutcomeRecord> {
    match record.r#type {
        RequestType::Payment => {
            let payment_method_id = record
                .method
                .as_deref()
                .and_then(|m| labels.get(m).copied().or_else(|| m.parse().ok()))
                .unwrap_or(Uuid::nil());
            let metadata = record
                .country
                .map(|c| HashMap::from([(COUNTRY_METADATA_KEY.to_string(), c)]))
                .unwrap_or_default();

            let response = orchestrator
                .process_payment(ProcessPaymentRequest {
                    trip_id: record.trip.unwrap_or_default(),
                    payer_id: record.user,
                    driver_id: record.driver.unwrap_or_default(),
                    amount: record.amount,
                    currency: record.currency.unwrap_or_else(|| "USD".to_string()),
                    payment_method_id,
                    metadata,
                    idempotency_key: Some(record.reference.clone()),
                })
                .await?;
            Ok(OutcomeRecord::from_payment(record.reference, &response))
        }
        RequestType::Refund => {
            let mut matches = orchestrator
                .get_payments_by_idempotency_key(&record.reference)
                .await?;
            let payment_id = match matches.len() {
                1 => matches.remove(0).id,
                0 => record.reference.parse().unwrap_or(Uuid::nil()),
                n => {
                    warn!(reference = %record.reference, payments = n, "ambiguous refund reference");
                    Uuid::nil()
                }
            };

            let response = orchestrator
                .process_refund(ProcessRefundRequest {
                    payment_id,
                    amount: record.amount,
                    reason: record.reason.unwrap_or_default(),
                    requested_by: record.user,
                })
                .await?;
            Ok(OutcomeRecord::from_refund(record.reference, &response))
        }
    }
}
