use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::reading::NewReading;

/// Meter value and date the current billing cycle is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillingCycleStart {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub units: f64,
}

impl BillingCycleStart {
    /// The synthetic reading appended whenever a cycle is (re)anchored.
    pub fn as_reading(&self) -> NewReading {
        NewReading {
            value: self.units,
            date: self.date,
            is_billing_cycle_start: true,
        }
    }
}

/// The owner-controlled settings the usage calculator works from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HouseConfig {
    pub monthly_goal: f64,
    pub billing_cycle_start: BillingCycleStart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub join_code: String,
    pub monthly_goal: f64,
    pub billing_cycle_start: BillingCycleStart,
}

impl House {
    pub fn config(&self) -> HouseConfig {
        HouseConfig {
            monthly_goal: self.monthly_goal,
            billing_cycle_start: self.billing_cycle_start,
        }
    }

    pub fn is_owner(&self, uid: &str) -> bool {
        self.owner_id == uid
    }
}

/// Everything needed to create a house; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHouse {
    pub name: String,
    pub owner_id: String,
    pub join_code: String,
    pub monthly_goal: f64,
    pub billing_cycle_start: BillingCycleStart,
}
