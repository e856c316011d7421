use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::{BillingCycleStart, Reading};

/// Units consumed in the current billing cycle plus the two readings the
/// figure was taken between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Consumption {
    pub units_consumed: f64,
    pub latest_value: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub latest_reading_date: OffsetDateTime,
    pub cycle_start_value: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub cycle_start_date: OffsetDateTime,
}

/// Consumption since the effective billing-cycle start.
///
/// The latest reading is the one with the greatest date; with no readings the
/// configured anchor units stand in for it, dated `now`. The effective cycle
/// start is the most recent billing-start reading dated at or before `now`,
/// falling back to the configured anchor. Readings with non-finite values are
/// ignored. Consumption is clamped at zero.
pub fn compute_consumption(
    readings: &[Reading],
    cycle_start: &BillingCycleStart,
    now: OffsetDateTime,
) -> Consumption {
    let (latest_value, latest_reading_date) = readings
        .iter()
        .filter(|r| r.value.is_finite())
        .max_by_key(|r| r.date)
        .map(|r| (r.value, r.date))
        .unwrap_or((cycle_start.units, now));

    let (cycle_start_value, cycle_start_date) = readings
        .iter()
        .filter(|r| r.is_billing_cycle_start && r.value.is_finite() && r.date <= now)
        .max_by_key(|r| r.date)
        .map(|r| (r.value, r.date))
        .unwrap_or((cycle_start.units, cycle_start.date));

    // f64::max drops a NaN operand, so a broken anchor also lands on zero.
    let units_consumed = (latest_value - cycle_start_value).max(0.0);

    Consumption {
        units_consumed,
        latest_value,
        latest_reading_date,
        cycle_start_value,
        cycle_start_date,
    }
}
