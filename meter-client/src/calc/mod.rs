//! Billing-cycle usage and pacing calculator.
//!
//! Every function here is pure: readings, configuration and the current time
//! come in as arguments, plain records come out. Nothing reads the clock and
//! nothing fails; degenerate inputs map to zero or `PaceStatus::Unknown`.

pub mod consumption;
pub mod pace;
pub mod projection;
pub mod snapshot;

pub use consumption::{compute_consumption, Consumption};
pub use pace::{classify_pace, PaceAssessment, PaceScale, PaceStatus, PacingGuide, ScaleKind};
pub use projection::{compute_projection, days_elapsed, Projection, DEFAULT_CYCLE_LENGTH_DAYS};
pub use snapshot::{
    compute_snapshot, days_since, goal_fill_percent, usage_series, ChartPoint, Snapshot, SnapshotOptions,
};

pub(crate) const SECONDS_PER_DAY: f64 = 86_400.0;
