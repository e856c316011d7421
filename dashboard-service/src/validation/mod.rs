//! Field rules for everything a member can submit.

use meter_client::domain::BillingCycleStart;
use time::{macros::datetime, OffsetDateTime};

pub const JOIN_CODE_LEN: usize = 8;
const MIN_HOUSE_NAME_CHARS: usize = 3;
const MIN_MONTHLY_GOAL: f64 = 1.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} cannot be negative")]
    Negative { field: &'static str },
    #[error("reading must be greater than the last reading of {last}")]
    ReadingNotIncreasing { last: f64 },
    #[error("goal must be positive")]
    GoalTooSmall,
    #[error("{field} timestamp out of allowed range")]
    DateOutOfRange { field: &'static str },
    #[error("house name must be at least 3 characters")]
    HouseNameTooShort,
    #[error("join code must be exactly 8 characters")]
    JoinCodeLength,
    #[error("{field} is required")]
    Required { field: &'static str },
}

fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite { field })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if finite(field, value)? < 0.0 {
        return Err(ValidationError::Negative { field });
    }
    Ok(value)
}

/// Dates must fall within [2000-01-01, 2100-01-01).
pub fn validate_date(field: &'static str, date: OffsetDateTime) -> Result<(), ValidationError> {
    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if date < min_ts || date >= max_ts {
        return Err(ValidationError::DateOutOfRange { field });
    }
    Ok(())
}

/// A freshly submitted reading must move the meter forward.
pub fn validate_new_reading(value: f64, date: OffsetDateTime, last_value: f64) -> Result<(), ValidationError> {
    finite("reading", value)?;
    validate_date("reading", date)?;
    if value <= last_value {
        return Err(ValidationError::ReadingNotIncreasing { last: last_value });
    }
    Ok(())
}

/// Corrections to an existing reading are only checked for sanity.
pub fn validate_edited_reading(value: f64, date: OffsetDateTime) -> Result<(), ValidationError> {
    non_negative("reading", value)?;
    validate_date("reading", date)
}

pub fn validate_goal(monthly_goal: f64) -> Result<(), ValidationError> {
    if finite("monthly goal", monthly_goal)? < MIN_MONTHLY_GOAL {
        return Err(ValidationError::GoalTooSmall);
    }
    Ok(())
}

pub fn validate_billing_start(start: &BillingCycleStart) -> Result<(), ValidationError> {
    non_negative("billing units", start.units)?;
    validate_date("billing", start.date)
}

/// Returns the trimmed house name.
pub fn validate_new_house(
    name: &str,
    monthly_goal: f64,
    start: &BillingCycleStart,
) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.chars().count() < MIN_HOUSE_NAME_CHARS {
        return Err(ValidationError::HouseNameTooShort);
    }
    validate_goal(monthly_goal)?;
    validate_billing_start(start)?;
    Ok(name.to_string())
}

pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    if code.trim().chars().count() != JOIN_CODE_LEN {
        return Err(ValidationError::JoinCodeLength);
    }
    Ok(())
}

/// Returns the trimmed name.
pub fn validate_name(field: &'static str, name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(name.to_string())
}
