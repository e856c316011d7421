use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use meter_client::domain::NewReading;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{Envelope, EnvelopeStream, ImportError, Source};

/// CSV export of a house's meter readings.
///
/// Expected header columns (by name):
/// - date (RFC3339 timestamp)
/// - value
/// - billing_cycle_start (optional, `true`/`false`)
///
/// A malformed row is yielded as an error and reading continues; only a file
/// that cannot be opened or has no header ends the stream early.
pub struct ReadingsCsvSource {
    path: PathBuf,
}

impl ReadingsCsvSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn parse_flag(s: &str) -> Result<bool, ImportError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(ImportError::Source(format!("invalid billing_cycle_start '{other}'"))),
    }
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<NewReading, ImportError> {
    let get = |name: &str| -> Result<&str, ImportError> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| ImportError::Source(format!("missing column '{name}' in CSV record")))
    };

    let date_str = get("date")?;
    let date = OffsetDateTime::parse(date_str.trim(), &Rfc3339)
        .map_err(|e| ImportError::Source(format!("invalid date '{date_str}': {e}")))?;

    let value_str = get("value")?;
    let value: f64 = value_str
        .trim()
        .parse()
        .map_err(|e| ImportError::Source(format!("invalid value '{value_str}': {e}")))?;

    let is_billing_cycle_start = match get("billing_cycle_start") {
        Ok(s) => parse_flag(s)?,
        Err(_) => false,
    };

    Ok(NewReading {
        value,
        date,
        is_billing_cycle_start,
    })
}

#[async_trait::async_trait]
impl Source<NewReading> for ReadingsCsvSource {
    async fn stream(&self) -> EnvelopeStream<NewReading> {
        let path = self.path.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(ImportError::Source(format!("failed to open CSV file: {e}")));
                    return;
                }
            };
            let mut rdr = csv::Reader::from_reader(file);
            let headers = match rdr.headers() {
                Ok(h) => h.clone(),
                Err(e) => {
                    yield Err(ImportError::Source(format!("failed to read CSV headers: {e}")));
                    return;
                }
            };

            for result in rdr.records() {
                let parsed = result
                    .map_err(|e| ImportError::Source(format!("failed to read CSV record: {e}")))
                    .and_then(|record| record_to_reading(&record, &headers));
                match parsed {
                    Ok(reading) => yield Ok(Envelope::new(reading)),
                    Err(e) => {
                        metrics::counter!("readings_csv_parse_errors_total").increment(1);
                        yield Err(e);
                    }
                }
            }
        };

        Box::pin(s)
    }
}
