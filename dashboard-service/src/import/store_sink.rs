use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::SystemTime,
};

use futures::StreamExt;
use meter_client::{
    db::HouseStore,
    domain::{NewReading, Reading},
};
use time::format_description::well_known::Rfc3339;

use super::{Envelope, ImportError, Sink};

/// Running totals for one import.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub inserted: AtomicU64,
    pub duplicates: AtomicU64,
    pub rejected: AtomicU64,
}

impl ImportStats {
    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Stable id for an imported reading, so the same row imported twice lands
/// on the same record.
pub fn reading_id(house_id: &str, reading: &NewReading) -> String {
    let date = reading
        .date
        .format(&Rfc3339)
        .unwrap_or_else(|_| reading.date.unix_timestamp().to_string());

    let mut hasher = blake3::Hasher::new();
    hasher.update(house_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(date.as_bytes());
    hasher.update(b"\0");
    hasher.update(&reading.value.to_bits().to_le_bytes());
    let hex = hasher.finalize().to_hex();
    format!("imp-{}", &hex.as_str()[..32])
}

/// Bind parameters per imported row in the bulk insert.
const BINDS_PER_READING: usize = 5;

/// Largest batch that fits in one statement under Postgres' bind limit.
pub const MAX_BATCH_SIZE: usize = u16::MAX as usize / BINDS_PER_READING;

/// Writes readings into one house in batches, skipping ids already present.
pub struct StoreSink {
    store: Arc<dyn HouseStore>,
    house_id: String,
    batch_size: usize,
    stats: Arc<ImportStats>,
}

impl StoreSink {
    pub fn new(store: Arc<dyn HouseStore>, house_id: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            house_id: house_id.into(),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            stats: Arc::new(ImportStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ImportStats> {
        self.stats.clone()
    }

    async fn flush_batch(&self, batch: &[Reading], oldest: Option<SystemTime>) -> Result<(), ImportError> {
        if batch.is_empty() {
            return Ok(());
        }

        match self.store.add_readings_idempotent(&self.house_id, batch).await {
            Ok(inserted) => {
                let skipped = batch.len() as u64 - inserted.min(batch.len() as u64);
                self.stats.inserted.fetch_add(inserted, Ordering::Relaxed);
                self.stats.duplicates.fetch_add(skipped, Ordering::Relaxed);
                metrics::counter!("readings_imported_total").increment(inserted);

                // Time from the oldest row being read to its batch landing.
                if let Some(dur) = oldest.and_then(|t| SystemTime::now().duration_since(t).ok()) {
                    metrics::histogram!("import_batch_latency_seconds").record(dur.as_secs_f64());
                }
                tracing::debug!(house_id = %self.house_id, inserted, skipped, "import batch flushed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, house_id = %self.house_id, "import batch failed");
                Err(ImportError::Sink(e.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl Sink<NewReading> for StoreSink {
    async fn run<S>(&self, mut input: S) -> Result<(), ImportError>
    where
        S: futures::Stream<Item = Result<Envelope<NewReading>, ImportError>> + Send + Unpin + 'static,
    {
        let mut buffer: Vec<Reading> = Vec::with_capacity(self.batch_size);
        let mut oldest: Option<SystemTime> = None;

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "skipping reading");
                    continue;
                }
            };

            oldest = Some(oldest.map_or(env.received_at, |t| t.min(env.received_at)));
            let id = reading_id(&self.house_id, &env.payload);
            buffer.push(env.payload.with_id(id));
            if buffer.len() >= self.batch_size {
                self.flush_batch(&buffer, oldest.take()).await?;
                buffer.clear();
            }
        }

        self.flush_batch(&buffer, oldest).await
    }
}
