use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single meter reading recorded against a house.
///
/// `value` is the cumulative meter register in kWh. Readings flagged
/// `is_billing_cycle_start` anchor a billing cycle and are never edited or
/// deleted through the ordinary reading paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: String,
    pub value: f64,
    #[serde(with = "time::serde::rfc3339")]
    #[sqlx(rename = "read_at")]
    pub date: OffsetDateTime,
    pub is_billing_cycle_start: bool,
}

/// A reading that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    pub value: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(default)]
    pub is_billing_cycle_start: bool,
}

impl NewReading {
    pub fn with_id(self, id: String) -> Reading {
        Reading {
            id,
            value: self.value,
            date: self.date,
            is_billing_cycle_start: self.is_billing_cycle_start,
        }
    }
}
