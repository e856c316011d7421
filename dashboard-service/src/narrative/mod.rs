//! Free-text pacing opinion from a hosted language model, checked against the
//! calculator's own classification.

pub mod http;

use meter_client::calc::{ChartPoint, PaceAssessment, PaceScale, PaceStatus};
use serde::{Deserialize, Serialize};

pub use http::HttpNarrativeAssessor;

pub const FALLBACK_LABEL: &str = "Unknown";
pub const FALLBACK_ANALYSIS: &str = "Could not perform analysis. Please try again.";

#[derive(thiserror::Error, Debug)]
pub enum NarrativeError {
    #[error("narrative request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("narrative endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("narrative output unusable: {0}")]
    InvalidOutput(String),
}

/// Scalars handed to the model, the same ones the calculator works from.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeRequest {
    pub monthly_goal: f64,
    pub current_usage: f64,
    pub days_elapsed: i64,
    pub cycle_length_days: u32,
    pub historical: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeOutput {
    pub pace_status: String,
    pub analysis: String,
    pub projected_usage: f64,
}

#[async_trait::async_trait]
pub trait NarrativeAssessor: Send + Sync {
    async fn assess(&self, request: &NarrativeRequest) -> Result<NarrativeOutput, NarrativeError>;
}

/// What the dashboard shows for an assessment.
///
/// `status` is always the calculator's three-level classification; the
/// model's label is carried alongside as advisory text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeReport {
    pub status: PaceStatus,
    pub projected_percent: Option<f64>,
    pub calculator_projected_usage: f64,
    pub narrative_label: String,
    pub narrative_status: Option<PaceStatus>,
    pub explanation: String,
    pub narrative_projected_usage: f64,
    pub agrees: bool,
    pub available: bool,
}

pub fn reconcile(
    calculator: PaceAssessment,
    calculator_projected_usage: f64,
    outcome: Result<NarrativeOutput, NarrativeError>,
) -> NarrativeReport {
    let output = match outcome {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(error = %e, "narrative assessment failed");
            metrics::counter!("narrative_failures_total").increment(1);
            return NarrativeReport {
                status: calculator.status,
                projected_percent: calculator.projected_percent,
                calculator_projected_usage,
                narrative_label: FALLBACK_LABEL.to_string(),
                narrative_status: None,
                explanation: FALLBACK_ANALYSIS.to_string(),
                narrative_projected_usage: 0.0,
                agrees: false,
                available: false,
            };
        }
    };

    // Only labels from the scale the model was asked to use count.
    let narrative_status = PaceStatus::from_label(&output.pace_status)
        .filter(|s| PaceScale::THREE_LEVEL.statuses().any(|allowed| allowed == *s));
    let agrees = narrative_status == Some(calculator.status);

    if !agrees {
        metrics::counter!("narrative_disagreements_total").increment(1);
        tracing::info!(
            calculator = %calculator.status,
            narrative = %output.pace_status,
            "narrative label disagrees with calculator"
        );
    }

    NarrativeReport {
        status: calculator.status,
        projected_percent: calculator.projected_percent,
        calculator_projected_usage,
        narrative_label: output.pace_status,
        narrative_status,
        explanation: output.analysis,
        narrative_projected_usage: output.projected_usage,
        agrees,
        available: true,
    }
}
