use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{
    consumption::compute_consumption,
    pace::{classify_pace, PaceAssessment, ScaleKind},
    projection::{compute_projection, DEFAULT_CYCLE_LENGTH_DAYS},
    SECONDS_PER_DAY,
};
use crate::domain::{HouseConfig, Reading};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    pub cycle_length_days: u32,
    pub scale: ScaleKind,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            cycle_length_days: DEFAULT_CYCLE_LENGTH_DAYS,
            scale: ScaleKind::default(),
        }
    }
}

/// Derived view over a house's readings and configuration at one instant.
/// Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    pub units_consumed: f64,
    /// Goal minus consumption; negative once the goal is exceeded.
    pub units_left: f64,
    pub percent_of_goal: f64,
    pub projected_usage: f64,
    pub avg_daily_usage: f64,
    pub days_elapsed: i64,
    pub pace: PaceAssessment,
    pub latest_value: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub latest_reading_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub cycle_start_date: OffsetDateTime,
}

pub fn compute_snapshot(
    readings: &[Reading],
    config: &HouseConfig,
    now: OffsetDateTime,
    options: SnapshotOptions,
) -> Snapshot {
    let consumption = compute_consumption(readings, &config.billing_cycle_start, now);
    let projection = compute_projection(
        consumption.units_consumed,
        consumption.cycle_start_date,
        now,
        options.cycle_length_days,
    );
    let pace = classify_pace(projection.projected_usage, config.monthly_goal, options.scale.scale());

    let percent_of_goal = if config.monthly_goal > 0.0 {
        consumption.units_consumed / config.monthly_goal * 100.0
    } else {
        0.0
    };

    Snapshot {
        units_consumed: consumption.units_consumed,
        units_left: config.monthly_goal - consumption.units_consumed,
        percent_of_goal,
        projected_usage: projection.projected_usage,
        avg_daily_usage: projection.avg_daily_usage,
        days_elapsed: projection.days_elapsed,
        pace,
        latest_value: consumption.latest_value,
        latest_reading_date: consumption.latest_reading_date,
        cycle_start_date: consumption.cycle_start_date,
    }
}

/// Percent of goal clamped to `[0, 100]` for progress bars.
pub fn goal_fill_percent(percent_of_goal: f64) -> f64 {
    if percent_of_goal.is_nan() {
        return 0.0;
    }
    percent_of_goal.clamp(0.0, 100.0)
}

/// Whole days between `date` and `now`, rounded down, never negative.
pub fn days_since(date: OffsetDateTime, now: OffsetDateTime) -> i64 {
    let days = (now - date).as_seconds_f64() / SECONDS_PER_DAY;
    (days.floor() as i64).max(0)
}

/// One point of the usage-over-time chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub value: f64,
}

/// Meter register progression, oldest first.
pub fn usage_series(readings: &[Reading]) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = readings
        .iter()
        .filter(|r| r.value.is_finite())
        .map(|r| ChartPoint {
            date: r.date,
            value: r.value,
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{PaceScale, PaceStatus};
    use crate::domain::BillingCycleStart;
    use time::macros::datetime;
    use time::Duration;

    const DAY0: OffsetDateTime = datetime!(2024-03-01 00:00:00 UTC);

    fn config(goal: f64) -> HouseConfig {
        HouseConfig {
            monthly_goal: goal,
            billing_cycle_start: BillingCycleStart {
                date: DAY0,
                units: 15_000.0,
            },
        }
    }

    fn readings(latest_day: i64) -> Vec<Reading> {
        vec![
            Reading {
                id: "start".into(),
                value: 15_000.0,
                date: DAY0,
                is_billing_cycle_start: true,
            },
            Reading {
                id: "latest".into(),
                value: 15_180.0,
                date: DAY0 + Duration::days(latest_day),
                is_billing_cycle_start: false,
            },
        ]
    }

    #[test]
    fn day_28_scenario_is_very_low() {
        let now = DAY0 + Duration::days(28);
        let s = compute_snapshot(&readings(28), &config(300.0), now, SnapshotOptions::default());

        assert_eq!(s.units_consumed, 180.0);
        assert_eq!(s.days_elapsed, 28);
        assert!((s.avg_daily_usage - 6.43).abs() < 0.01);
        assert!((s.projected_usage - 192.9).abs() < 0.1);
        let pct = s.pace.projected_percent.unwrap_or_default();
        assert!((pct - 64.3).abs() < 0.1);
        assert_eq!(s.pace.status, PaceStatus::VeryLow);
        assert_eq!(s.units_left, 120.0);
        assert!((s.percent_of_goal - 60.0).abs() < 1e-9);
    }

    #[test]
    fn day_10_scenario_is_very_high_and_high() {
        let now = DAY0 + Duration::days(10);
        let five = compute_snapshot(&readings(10), &config(300.0), now, SnapshotOptions::default());
        assert_eq!(five.projected_usage, 540.0);
        assert_eq!(five.pace.projected_percent, Some(180.0));
        assert_eq!(five.pace.status, PaceStatus::VeryHigh);

        let three = compute_snapshot(
            &readings(10),
            &config(300.0),
            now,
            SnapshotOptions {
                scale: ScaleKind::ThreeLevel,
                ..SnapshotOptions::default()
            },
        );
        assert_eq!(three.pace.status, PaceStatus::High);
        assert_eq!(
            PaceScale::THREE_LEVEL.classify_percent(180.0),
            three.pace.status
        );
    }

    #[test]
    fn zero_goal_degrades_without_panicking() {
        let now = DAY0 + Duration::days(5);
        let s = compute_snapshot(&readings(5), &config(0.0), now, SnapshotOptions::default());
        assert_eq!(s.pace.status, PaceStatus::Unknown);
        assert_eq!(s.percent_of_goal, 0.0);
        assert!(s.projected_usage.is_finite());
    }

    #[test]
    fn identical_inputs_give_identical_snapshots() {
        let now = DAY0 + Duration::days(17) + Duration::hours(5);
        let a = compute_snapshot(&readings(17), &config(300.0), now, SnapshotOptions::default());
        let b = compute_snapshot(&readings(17), &config(300.0), now, SnapshotOptions::default());
        assert_eq!(a, b);
        assert_eq!(a.projected_usage.to_bits(), b.projected_usage.to_bits());
    }

    #[test]
    fn fill_percent_is_clamped() {
        assert_eq!(goal_fill_percent(-5.0), 0.0);
        assert_eq!(goal_fill_percent(42.5), 42.5);
        assert_eq!(goal_fill_percent(180.0), 100.0);
        assert_eq!(goal_fill_percent(f64::NAN), 0.0);
    }

    #[test]
    fn days_since_floors_and_never_goes_negative() {
        assert_eq!(days_since(DAY0, DAY0 + Duration::hours(47)), 1);
        assert_eq!(days_since(DAY0, DAY0 + Duration::days(2)), 2);
        assert_eq!(days_since(DAY0 + Duration::days(1), DAY0), 0);
    }

    #[test]
    fn series_is_sorted_oldest_first() {
        let mut rs = readings(12);
        rs.reverse();
        let series = usage_series(&rs);
        assert_eq!(series.len(), 2);
        assert!(series[0].date < series[1].date);
        assert_eq!(series[0].value, 15_000.0);
    }
}
