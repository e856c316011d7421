use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete pace label shown next to the projected usage.
///
/// Variant order is severity order, `Unknown` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceStatus {
    Unknown,
    VeryLow,
    Low,
    OnTrack,
    SlightlyHigh,
    High,
    VeryHigh,
}

impl PaceStatus {
    pub fn label(self) -> &'static str {
        match self {
            PaceStatus::Unknown => "Unknown",
            PaceStatus::VeryLow => "Very Low",
            PaceStatus::Low => "Low",
            PaceStatus::OnTrack => "On Track",
            PaceStatus::SlightlyHigh => "Slightly High",
            PaceStatus::High => "High",
            PaceStatus::VeryHigh => "Very High",
        }
    }

    /// Parse a display label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        [
            PaceStatus::Unknown,
            PaceStatus::VeryLow,
            PaceStatus::Low,
            PaceStatus::OnTrack,
            PaceStatus::SlightlyHigh,
            PaceStatus::High,
            PaceStatus::VeryHigh,
        ]
        .into_iter()
        .find(|s| s.label().eq_ignore_ascii_case(wanted))
    }

    pub fn description(self) -> &'static str {
        match self {
            PaceStatus::Unknown => "Not enough information to judge the pace.",
            PaceStatus::VeryLow => "Consumption is much lower than target pace. Excellent!",
            PaceStatus::Low => "Consumption is lower than target pace. Great job!",
            PaceStatus::OnTrack => "Consumption is on track to meet the goal.",
            PaceStatus::SlightlyHigh => "Consumption is a bit above target pace.",
            PaceStatus::High => "Consumption is higher than target pace.",
            PaceStatus::VeryHigh => "Consumption is much higher than target pace.",
        }
    }

    /// Marker position (0-100) on the five-step pacing gauge, whose label
    /// bands are Very Low [0, 30), Low [30, 50), On Track [50, 70),
    /// High [70, 90) and Very High [90, 100]. `SlightlyHigh` only exists on
    /// the three-level scale and has no place on the gauge.
    pub fn gauge_position(self) -> Option<u8> {
        match self {
            PaceStatus::Unknown => Some(50),
            PaceStatus::VeryLow => Some(20),
            PaceStatus::Low => Some(40),
            PaceStatus::OnTrack => Some(60),
            PaceStatus::SlightlyHigh => None,
            PaceStatus::High => Some(80),
            PaceStatus::VeryHigh => Some(100),
        }
    }
}

impl fmt::Display for PaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered bucket table over projected-percent-of-goal.
///
/// A percentage falls in the first bucket whose inclusive upper bound it does
/// not exceed; anything above the last bound gets `overflow`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceScale {
    pub name: &'static str,
    pub buckets: &'static [(f64, PaceStatus)],
    pub overflow: PaceStatus,
}

impl PaceScale {
    pub const THREE_LEVEL: PaceScale = PaceScale {
        name: "three_level",
        buckets: &[(100.0, PaceStatus::OnTrack), (120.0, PaceStatus::SlightlyHigh)],
        overflow: PaceStatus::High,
    };

    pub const FIVE_LEVEL: PaceScale = PaceScale {
        name: "five_level",
        buckets: &[
            (70.0, PaceStatus::VeryLow),
            (95.0, PaceStatus::Low),
            (115.0, PaceStatus::OnTrack),
            (150.0, PaceStatus::High),
        ],
        overflow: PaceStatus::VeryHigh,
    };

    pub fn classify_percent(&self, projected_percent: f64) -> PaceStatus {
        if projected_percent.is_nan() {
            return PaceStatus::Unknown;
        }
        self.buckets
            .iter()
            .find(|(upper, _)| projected_percent <= *upper)
            .map(|(_, status)| *status)
            .unwrap_or(self.overflow)
    }

    /// Every label this scale can produce, lowest severity first.
    pub fn statuses(&self) -> impl Iterator<Item = PaceStatus> + '_ {
        self.buckets
            .iter()
            .map(|(_, status)| *status)
            .chain(std::iter::once(self.overflow))
    }
}

/// Identifier used in configuration and requests to pick a preset scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    ThreeLevel,
    #[default]
    FiveLevel,
}

impl ScaleKind {
    pub fn scale(self) -> &'static PaceScale {
        match self {
            ScaleKind::ThreeLevel => &PaceScale::THREE_LEVEL,
            ScaleKind::FiveLevel => &PaceScale::FIVE_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaceAssessment {
    pub status: PaceStatus,
    /// `None` when the goal is not a positive number.
    pub projected_percent: Option<f64>,
}

/// Everything the pacing guide card shows for one assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PacingGuide {
    pub status: PaceStatus,
    pub label: &'static str,
    pub projected_percent: Option<f64>,
    pub description: &'static str,
    pub gauge_position: Option<u8>,
}

impl From<PaceAssessment> for PacingGuide {
    fn from(a: PaceAssessment) -> Self {
        PacingGuide {
            status: a.status,
            label: a.status.label(),
            projected_percent: a.projected_percent,
            description: a.status.description(),
            gauge_position: a.status.gauge_position(),
        }
    }
}

/// Classify projected usage against the monthly goal on the given scale.
///
/// A goal that is not a finite positive number is a configuration problem,
/// not an error: the result is `Unknown` with no percentage.
pub fn classify_pace(projected_usage: f64, monthly_goal: f64, scale: &PaceScale) -> PaceAssessment {
    if !monthly_goal.is_finite() || monthly_goal <= 0.0 || projected_usage.is_nan() {
        return PaceAssessment {
            status: PaceStatus::Unknown,
            projected_percent: None,
        };
    }

    let projected_percent = projected_usage / monthly_goal * 100.0;
    PaceAssessment {
        status: scale.classify_percent(projected_percent),
        projected_percent: Some(projected_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_level_boundaries() {
        let s = &PaceScale::THREE_LEVEL;
        assert_eq!(s.classify_percent(0.0), PaceStatus::OnTrack);
        assert_eq!(s.classify_percent(100.0), PaceStatus::OnTrack);
        assert_eq!(s.classify_percent(100.01), PaceStatus::SlightlyHigh);
        assert_eq!(s.classify_percent(120.0), PaceStatus::SlightlyHigh);
        assert_eq!(s.classify_percent(120.01), PaceStatus::High);
    }

    #[test]
    fn five_level_boundaries() {
        let s = &PaceScale::FIVE_LEVEL;
        assert_eq!(s.classify_percent(70.0), PaceStatus::VeryLow);
        assert_eq!(s.classify_percent(70.01), PaceStatus::Low);
        assert_eq!(s.classify_percent(95.0), PaceStatus::Low);
        assert_eq!(s.classify_percent(95.01), PaceStatus::OnTrack);
        assert_eq!(s.classify_percent(115.0), PaceStatus::OnTrack);
        assert_eq!(s.classify_percent(115.01), PaceStatus::High);
        assert_eq!(s.classify_percent(150.0), PaceStatus::High);
        assert_eq!(s.classify_percent(150.01), PaceStatus::VeryHigh);
    }

    #[test]
    fn scales_partition_the_non_negative_line_monotonically() {
        for scale in [&PaceScale::THREE_LEVEL, &PaceScale::FIVE_LEVEL] {
            let labels: Vec<PaceStatus> = scale.statuses().collect();
            let mut prev = PaceStatus::Unknown;
            let mut p = 0.0;
            while p <= 400.0 {
                let status = scale.classify_percent(p);
                assert!(labels.contains(&status), "{} produced {status} at {p}", scale.name);
                assert!(status >= prev, "{} went backwards at {p}", scale.name);
                prev = status;
                p += 0.125;
            }
            assert_eq!(scale.classify_percent(f64::INFINITY), scale.overflow);
        }
    }

    #[test]
    fn non_positive_goal_is_unknown() {
        for goal in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let a = classify_pace(120.0, goal, &PaceScale::FIVE_LEVEL);
            assert_eq!(a.status, PaceStatus::Unknown);
            assert_eq!(a.projected_percent, None);
        }
    }

    #[test]
    fn classify_reports_percent() {
        let a = classify_pace(540.0, 300.0, &PaceScale::THREE_LEVEL);
        assert_eq!(a.status, PaceStatus::High);
        assert_eq!(a.projected_percent, Some(180.0));
    }

    #[test]
    fn labels_round_trip_case_insensitively() {
        assert_eq!(PaceStatus::from_label(" on track "), Some(PaceStatus::OnTrack));
        assert_eq!(PaceStatus::from_label("Slightly High"), Some(PaceStatus::SlightlyHigh));
        assert_eq!(PaceStatus::from_label("Moderate"), None);
    }

    #[test]
    fn gauge_positions_fall_in_their_label_band() {
        let band = |status: PaceStatus| match status {
            PaceStatus::VeryLow => 0..30,
            PaceStatus::Low => 30..50,
            PaceStatus::OnTrack | PaceStatus::Unknown => 50..70,
            PaceStatus::High => 70..90,
            _ => 90..101,
        };
        for status in PaceScale::FIVE_LEVEL.statuses().chain([PaceStatus::Unknown]) {
            let pos = status.gauge_position().unwrap();
            assert!(band(status).contains(&pos), "{status} marker {pos} outside its band");
        }
        assert_eq!(PaceStatus::SlightlyHigh.gauge_position(), None);
    }

    #[test]
    fn pacing_guide_carries_wording_and_marker() {
        let guide = PacingGuide::from(classify_pace(540.0, 300.0, &PaceScale::FIVE_LEVEL));
        assert_eq!(guide.status, PaceStatus::VeryHigh);
        assert_eq!(guide.label, "Very High");
        assert_eq!(guide.description, "Consumption is much higher than target pace.");
        assert_eq!(guide.gauge_position, Some(100));
        assert_eq!(guide.projected_percent, Some(180.0));
    }

    #[test]
    fn scale_kind_selects_preset() {
        assert_eq!(ScaleKind::default().scale(), &PaceScale::FIVE_LEVEL);
        assert_eq!(ScaleKind::ThreeLevel.scale().overflow, PaceStatus::High);
    }
}
