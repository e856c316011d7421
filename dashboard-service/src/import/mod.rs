//! Bulk reading import: source → transform → sink.

pub mod readings_csv;
pub mod store_sink;

use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};
use meter_client::domain::NewReading;

use crate::validation;

pub use readings_csv::ReadingsCsvSource;
pub use store_sink::{ImportStats, StoreSink};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

pub type EnvelopeStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, ImportError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, ImportError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<(), ImportError>
    where
        S: Stream<Item = Result<Envelope<T>, ImportError>> + Send + Unpin + 'static;
}

pub struct ImportPipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T>>>,
    pub sink: K,
}

impl<T, S, K> ImportPipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + 'static,
    K: Sink<T> + 'static,
{
    pub async fn run(self) -> Result<(), ImportError> {
        let mut stream = self.source.stream().await;

        for t in self.transforms {
            stream = Box::pin(stream.then(move |item| {
                let t = t.clone();
                async move {
                    match item {
                        Ok(env) => t.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}

/// Rejects readings that are negative, non-finite or outside the date window.
/// Billing-start rows are rejected too: moving the cycle anchor is the
/// owner's rebase action, never a side effect of an import.
#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<NewReading, NewReading> for ReadingValidation {
    async fn apply(&self, input: Envelope<NewReading>) -> Result<Envelope<NewReading>, ImportError> {
        let r = &input.payload;
        if r.is_billing_cycle_start {
            metrics::counter!("validation_rejected_total").increment(1);
            return Err(ImportError::Transform(
                "billing cycle start readings cannot be imported; rebase the billing cycle instead".into(),
            ));
        }
        match validation::validate_edited_reading(r.value, r.date) {
            Ok(()) => Ok(input),
            Err(e) => {
                metrics::counter!("validation_rejected_total").increment(1);
                Err(ImportError::Transform(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(value: f64, date: time::OffsetDateTime) -> Envelope<NewReading> {
        Envelope::new(NewReading {
            value,
            date,
            is_billing_cycle_start: false,
        })
    }

    #[tokio::test]
    async fn validation_accepts_plausible_reading() {
        let res = ReadingValidation
            .apply(reading(15_000.0, datetime!(2024-03-01 00:00:00 UTC)))
            .await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn validation_rejects_negative_value() {
        let res = ReadingValidation
            .apply(reading(-1.0, datetime!(2024-03-01 00:00:00 UTC)))
            .await;
        assert!(matches!(res, Err(ImportError::Transform(_))));
    }

    #[tokio::test]
    async fn validation_rejects_billing_start_rows() {
        let mut env = reading(15_170.0, datetime!(2024-03-20 00:00:00 UTC));
        env.payload.is_billing_cycle_start = true;
        let res = ReadingValidation.apply(env).await;
        assert!(matches!(res, Err(ImportError::Transform(_))));
    }

    #[tokio::test]
    async fn validation_rejects_out_of_range_date() {
        let res = ReadingValidation
            .apply(reading(1.0, datetime!(1800-01-01 00:00:00 UTC)))
            .await;
        assert!(matches!(res, Err(ImportError::Transform(_))));
    }
}
