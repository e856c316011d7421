use serde::Serialize;
use time::OffsetDateTime;

use super::SECONDS_PER_DAY;

/// Nominal billing cycle length used when nothing else is configured.
pub const DEFAULT_CYCLE_LENGTH_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub days_elapsed: i64,
    pub avg_daily_usage: f64,
    pub projected_usage: f64,
}

/// Whole days since the cycle started, rounded up, never less than one.
pub fn days_elapsed(cycle_start_date: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let days = (now - cycle_start_date).as_seconds_f64() / SECONDS_PER_DAY;
    // Saturating float->int cast; a start in the future gives a negative value.
    (days.ceil() as i64).max(1)
}

/// Linear extrapolation of the average daily usage to a full cycle.
///
/// No smoothing and no weighting by earlier cycles: early in a cycle a single
/// heavy day moves the projection a lot.
pub fn compute_projection(
    units_consumed: f64,
    cycle_start_date: OffsetDateTime,
    now: OffsetDateTime,
    cycle_length_days: u32,
) -> Projection {
    let days_elapsed = days_elapsed(cycle_start_date, now);
    let avg_daily_usage = units_consumed / days_elapsed as f64;
    let projected_usage = avg_daily_usage * f64::from(cycle_length_days);

    Projection {
        days_elapsed,
        avg_daily_usage,
        projected_usage,
    }
}
