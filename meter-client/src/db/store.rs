use time::OffsetDateTime;

use crate::domain::{BillingCycleStart, House, JoinRequest, JoinRequestStatus, NewHouse, NewReading, Reading, User};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for users, houses, readings and join requests.
///
/// Operations that touch more than one record (`create_house`,
/// `rebase_billing_cycle`, `resolve_join_request`) are all-or-nothing.
/// Billing-start readings cannot be changed through `update_reading` or
/// `delete_reading`; both report `NotFound` for them.
#[async_trait::async_trait]
pub trait HouseStore: Send + Sync {
    async fn create_user(&self, user: &User) -> StoreResult<()>;
    async fn get_user(&self, uid: &str) -> StoreResult<Option<User>>;
    async fn update_user_name(&self, uid: &str, name: &str) -> StoreResult<()>;
    async fn set_user_house(&self, uid: &str, house_id: Option<&str>) -> StoreResult<()>;

    /// Insert the house, point the owner at it and record the initial
    /// billing-start reading.
    async fn create_house(&self, house: NewHouse) -> StoreResult<House>;
    async fn get_house(&self, house_id: &str) -> StoreResult<Option<House>>;
    async fn get_house_by_join_code(&self, join_code: &str) -> StoreResult<Option<House>>;
    async fn get_house_members(&self, house_id: &str) -> StoreResult<Vec<User>>;
    async fn update_house_name(&self, house_id: &str, name: &str) -> StoreResult<()>;
    async fn update_monthly_goal(&self, house_id: &str, monthly_goal: f64) -> StoreResult<()>;
    /// Move the billing anchor and append the matching billing-start reading.
    async fn rebase_billing_cycle(&self, house_id: &str, start: BillingCycleStart) -> StoreResult<Reading>;

    async fn add_reading(&self, house_id: &str, reading: NewReading) -> StoreResult<Reading>;
    /// Insert readings with caller-chosen ids, skipping ids already present.
    /// Returns the number actually inserted.
    async fn add_readings_idempotent(&self, house_id: &str, readings: &[Reading]) -> StoreResult<u64>;
    async fn get_readings(&self, house_id: &str) -> StoreResult<Vec<Reading>>;
    async fn get_reading(&self, house_id: &str, reading_id: &str) -> StoreResult<Option<Reading>>;
    async fn update_reading(
        &self,
        house_id: &str,
        reading_id: &str,
        value: f64,
        date: OffsetDateTime,
    ) -> StoreResult<()>;
    async fn delete_reading(&self, house_id: &str, reading_id: &str) -> StoreResult<()>;

    async fn create_join_request(
        &self,
        house_id: &str,
        requester_id: &str,
        requester_name: &str,
    ) -> StoreResult<JoinRequest>;
    async fn get_pending_join_requests(&self, house_id: &str) -> StoreResult<Vec<JoinRequest>>;
    async fn get_join_request(&self, request_id: &str) -> StoreResult<Option<JoinRequest>>;
    /// Drop the request; when approved, also move the requester into the house.
    async fn resolve_join_request(&self, request_id: &str, status: JoinRequestStatus) -> StoreResult<()>;
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
