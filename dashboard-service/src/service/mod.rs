mod error;

use std::sync::Arc;

use meter_client::{
    calc::{self, ChartPoint, PaceAssessment, PaceScale, PacingGuide, Snapshot, SnapshotOptions},
    db::{HouseStore, StoreError},
    domain::{BillingCycleStart, House, JoinRequest, JoinRequestStatus, NewHouse, NewReading, Reading, User},
};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::narrative::{self, NarrativeAssessor, NarrativeReport, NarrativeRequest};
use crate::validation::{self, ValidationError, JOIN_CODE_LEN};

pub use error::ServiceError;

pub type ServiceResult<T> = Result<T, ServiceError>;

const JOIN_CODE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHouse {
    pub name: String,
    pub monthly_goal: f64,
    pub billing_cycle_start: BillingCycleStart,
}

/// Everything the dashboard page renders for one member at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub house: House,
    pub is_owner: bool,
    pub snapshot: Snapshot,
    pub three_level: PaceAssessment,
    pub five_level: PaceAssessment,
    pub pacing_guide: PacingGuide,
    pub goal_fill_percent: f64,
    pub days_since_last_reading: i64,
    pub series: Vec<ChartPoint>,
}

/// House membership, ownership rules and dashboard assembly over a
/// `HouseStore`.
pub struct HouseholdService {
    store: Arc<dyn HouseStore>,
    narrative: Option<Arc<dyn NarrativeAssessor>>,
    options: SnapshotOptions,
}

fn checked<T>(res: Result<T, ValidationError>) -> ServiceResult<T> {
    res.map_err(|e| {
        metrics::counter!("validation_rejected_total").increment(1);
        ServiceError::Validation(e)
    })
}

pub fn generate_join_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JOIN_CODE_LEN)
        .map(char::from)
        .collect()
}

impl HouseholdService {
    pub fn new(store: Arc<dyn HouseStore>, options: SnapshotOptions) -> Self {
        Self {
            store,
            narrative: None,
            options,
        }
    }

    pub fn with_narrative(mut self, assessor: Arc<dyn NarrativeAssessor>) -> Self {
        self.narrative = Some(assessor);
        self
    }

    async fn require_user(&self, uid: &str) -> ServiceResult<User> {
        self.store
            .get_user(uid)
            .await?
            .ok_or_else(|| ServiceError::UnknownUser(uid.to_string()))
    }

    async fn require_house(&self, house_id: &str) -> ServiceResult<House> {
        self.store
            .get_house(house_id)
            .await?
            .ok_or_else(|| ServiceError::HouseNotFound(house_id.to_string()))
    }

    async fn require_member(&self, uid: &str, house_id: &str) -> ServiceResult<(User, House)> {
        let user = self.require_user(uid).await?;
        let house = self.require_house(house_id).await?;
        if user.house_id.as_deref() != Some(house.id.as_str()) {
            return Err(ServiceError::NotMember);
        }
        Ok((user, house))
    }

    async fn require_owner(&self, uid: &str, house_id: &str) -> ServiceResult<House> {
        let (_, house) = self.require_member(uid, house_id).await?;
        if !house.is_owner(uid) {
            return Err(ServiceError::NotOwner);
        }
        Ok(house)
    }

    async fn require_editable_reading(&self, house_id: &str, reading_id: &str) -> ServiceResult<Reading> {
        let reading = self
            .store
            .get_reading(house_id, reading_id)
            .await?
            .ok_or_else(|| ServiceError::ReadingNotFound(reading_id.to_string()))?;
        if reading.is_billing_cycle_start {
            return Err(ServiceError::ProtectedReading);
        }
        Ok(reading)
    }

    pub async fn register_user(&self, uid: &str, name: &str, email: &str) -> ServiceResult<User> {
        let name = checked(validation::validate_name("name", name))?;
        let email = checked(validation::validate_name("email", email))?;
        let user = User {
            uid: uid.to_string(),
            name,
            email,
            house_id: None,
        };
        self.store.create_user(&user).await?;
        tracing::info!(uid, "user registered");
        Ok(user)
    }

    pub async fn rename_user(&self, uid: &str, name: &str) -> ServiceResult<()> {
        let name = checked(validation::validate_name("name", name))?;
        self.require_user(uid).await?;
        self.store.update_user_name(uid, &name).await?;
        Ok(())
    }

    pub async fn create_house(&self, uid: &str, req: CreateHouse) -> ServiceResult<House> {
        let name = checked(validation::validate_new_house(
            &req.name,
            req.monthly_goal,
            &req.billing_cycle_start,
        ))?;
        let user = self.require_user(uid).await?;
        if user.house_id.is_some() {
            return Err(ServiceError::AlreadyInHouse);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let new_house = NewHouse {
                name: name.clone(),
                owner_id: uid.to_string(),
                join_code: generate_join_code(),
                monthly_goal: req.monthly_goal,
                billing_cycle_start: req.billing_cycle_start,
            };
            match self.store.create_house(new_house).await {
                Ok(house) => {
                    tracing::info!(house_id = %house.id, owner = uid, "house created");
                    return Ok(house);
                }
                // A join code collision; draw a fresh code.
                Err(StoreError::Conflict(msg)) if attempt < JOIN_CODE_ATTEMPTS => {
                    tracing::warn!(attempt, %msg, "house creation conflicted, retrying with new join code");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn dashboard(&self, uid: &str, house_id: &str, now: OffsetDateTime) -> ServiceResult<Dashboard> {
        let (_, house) = self.require_member(uid, house_id).await?;
        let readings = self.store.get_readings(house_id).await?;
        let config = house.config();

        let snapshot = calc::compute_snapshot(&readings, &config, now, self.options);
        let three_level = calc::classify_pace(snapshot.projected_usage, config.monthly_goal, &PaceScale::THREE_LEVEL);
        let five_level = calc::classify_pace(snapshot.projected_usage, config.monthly_goal, &PaceScale::FIVE_LEVEL);

        Ok(Dashboard {
            is_owner: house.is_owner(uid),
            goal_fill_percent: calc::goal_fill_percent(snapshot.percent_of_goal),
            days_since_last_reading: calc::days_since(snapshot.latest_reading_date, now),
            series: calc::usage_series(&readings),
            snapshot,
            three_level,
            pacing_guide: five_level.into(),
            five_level,
            house,
        })
    }

    pub async fn readings(&self, uid: &str, house_id: &str) -> ServiceResult<Vec<Reading>> {
        self.require_member(uid, house_id).await?;
        Ok(self.store.get_readings(house_id).await?)
    }

    pub async fn add_reading(
        &self,
        uid: &str,
        house_id: &str,
        value: f64,
        date: OffsetDateTime,
    ) -> ServiceResult<Reading> {
        let (_, house) = self.require_member(uid, house_id).await?;
        let readings = self.store.get_readings(house_id).await?;
        let last = calc::compute_consumption(&readings, &house.billing_cycle_start, date).latest_value;
        checked(validation::validate_new_reading(value, date, last))?;

        let reading = self
            .store
            .add_reading(
                house_id,
                NewReading {
                    value,
                    date,
                    is_billing_cycle_start: false,
                },
            )
            .await?;
        metrics::counter!("readings_added_total").increment(1);
        tracing::info!(house_id, reading_id = %reading.id, value, "reading added");
        Ok(reading)
    }

    pub async fn edit_reading(
        &self,
        uid: &str,
        house_id: &str,
        reading_id: &str,
        value: f64,
        date: OffsetDateTime,
    ) -> ServiceResult<()> {
        checked(validation::validate_edited_reading(value, date))?;
        self.require_member(uid, house_id).await?;
        self.require_editable_reading(house_id, reading_id).await?;
        self.store.update_reading(house_id, reading_id, value, date).await?;
        tracing::info!(house_id, reading_id, "reading edited");
        Ok(())
    }

    pub async fn delete_reading(&self, uid: &str, house_id: &str, reading_id: &str) -> ServiceResult<()> {
        self.require_member(uid, house_id).await?;
        self.require_editable_reading(house_id, reading_id).await?;
        self.store.delete_reading(house_id, reading_id).await?;
        tracing::info!(house_id, reading_id, "reading deleted");
        Ok(())
    }

    /// Change the goal only; the billing anchor is left alone.
    pub async fn update_goal(&self, uid: &str, house_id: &str, monthly_goal: f64) -> ServiceResult<()> {
        checked(validation::validate_goal(monthly_goal))?;
        self.require_owner(uid, house_id).await?;
        self.store.update_monthly_goal(house_id, monthly_goal).await?;
        tracing::info!(house_id, monthly_goal, "monthly goal updated");
        Ok(())
    }

    pub async fn rebase_billing_cycle(
        &self,
        uid: &str,
        house_id: &str,
        start: BillingCycleStart,
    ) -> ServiceResult<Reading> {
        checked(validation::validate_billing_start(&start))?;
        self.require_owner(uid, house_id).await?;
        let reading = self.store.rebase_billing_cycle(house_id, start).await?;
        tracing::info!(house_id, units = start.units, "billing cycle rebased");
        Ok(reading)
    }

    pub async fn rename_house(&self, uid: &str, house_id: &str, name: &str) -> ServiceResult<()> {
        let name = checked(validation::validate_name("house name", name))?;
        self.require_owner(uid, house_id).await?;
        self.store.update_house_name(house_id, &name).await?;
        Ok(())
    }

    pub async fn members(&self, uid: &str, house_id: &str) -> ServiceResult<Vec<User>> {
        self.require_member(uid, house_id).await?;
        Ok(self.store.get_house_members(house_id).await?)
    }

    pub async fn remove_member(&self, uid: &str, house_id: &str, member_uid: &str) -> ServiceResult<()> {
        let house = self.require_owner(uid, house_id).await?;
        if house.is_owner(member_uid) {
            return Err(ServiceError::CannotRemoveOwner);
        }
        let member = self.require_user(member_uid).await?;
        if member.house_id.as_deref() != Some(house_id) {
            return Err(ServiceError::NotMember);
        }
        self.store.set_user_house(member_uid, None).await?;
        tracing::info!(house_id, member = member_uid, "member removed");
        Ok(())
    }

    pub async fn request_to_join(&self, uid: &str, join_code: &str) -> ServiceResult<JoinRequest> {
        checked(validation::validate_join_code(join_code))?;
        let user = self.require_user(uid).await?;
        if user.house_id.is_some() {
            return Err(ServiceError::AlreadyInHouse);
        }

        let house = self
            .store
            .get_house_by_join_code(join_code.trim())
            .await?
            .ok_or(ServiceError::UnknownJoinCode)?;

        let pending = self.store.get_pending_join_requests(&house.id).await?;
        if pending.iter().any(|r| r.requester_id == uid) {
            return Err(ServiceError::DuplicateRequest);
        }

        let request = self.store.create_join_request(&house.id, uid, &user.name).await?;
        tracing::info!(house_id = %house.id, requester = uid, "join request created");
        Ok(request)
    }

    pub async fn pending_requests(&self, uid: &str, house_id: &str) -> ServiceResult<Vec<JoinRequest>> {
        self.require_owner(uid, house_id).await?;
        Ok(self.store.get_pending_join_requests(house_id).await?)
    }

    pub async fn resolve_request(&self, uid: &str, request_id: &str, approve: bool) -> ServiceResult<()> {
        let request = self
            .store
            .get_join_request(request_id)
            .await?
            .ok_or_else(|| ServiceError::RequestNotFound(request_id.to_string()))?;
        self.require_owner(uid, &request.house_id).await?;

        let status = if approve {
            let requester = self.require_user(&request.requester_id).await?;
            if requester.house_id.is_some() {
                return Err(ServiceError::AlreadyInHouse);
            }
            JoinRequestStatus::Approved
        } else {
            JoinRequestStatus::Rejected
        };

        self.store.resolve_join_request(request_id, status).await?;
        tracing::info!(house_id = %request.house_id, request_id, %status, "join request resolved");
        Ok(())
    }

    /// Ask the narrative service for an opinion and set it beside the
    /// calculator's three-level classification. A failed call degrades to
    /// the fallback report rather than an error.
    pub async fn assess(&self, uid: &str, house_id: &str, now: OffsetDateTime) -> ServiceResult<NarrativeReport> {
        let assessor = self.narrative.as_ref().ok_or(ServiceError::NarrativeUnavailable)?;
        let (_, house) = self.require_member(uid, house_id).await?;
        let readings = self.store.get_readings(house_id).await?;
        let config = house.config();

        let consumption = calc::compute_consumption(&readings, &config.billing_cycle_start, now);
        let projection = calc::compute_projection(
            consumption.units_consumed,
            consumption.cycle_start_date,
            now,
            self.options.cycle_length_days,
        );
        let assessment = calc::classify_pace(projection.projected_usage, config.monthly_goal, &PaceScale::THREE_LEVEL);

        let request = NarrativeRequest {
            monthly_goal: config.monthly_goal,
            current_usage: consumption.units_consumed,
            days_elapsed: projection.days_elapsed,
            cycle_length_days: self.options.cycle_length_days,
            historical: calc::usage_series(&readings)
                .into_iter()
                .filter(|p| p.date >= consumption.cycle_start_date)
                .collect(),
        };

        let outcome = assessor.assess(&request).await;
        Ok(narrative::reconcile(assessment, projection.projected_usage, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use meter_client::{calc::PaceStatus, MemoryStore};
    use time::{macros::datetime, Duration};

    use crate::narrative::{NarrativeError, NarrativeOutput, FALLBACK_LABEL};

    const START: OffsetDateTime = datetime!(2024-03-01 00:00:00 UTC);

    struct FixedNarrative(&'static str);

    #[async_trait]
    impl NarrativeAssessor for FixedNarrative {
        async fn assess(&self, req: &NarrativeRequest) -> Result<NarrativeOutput, NarrativeError> {
            Ok(NarrativeOutput {
                pace_status: self.0.to_string(),
                analysis: format!("{} units so far", req.current_usage),
                projected_usage: req.current_usage * 2.0,
            })
        }
    }

    struct BrokenNarrative;

    #[async_trait]
    impl NarrativeAssessor for BrokenNarrative {
        async fn assess(&self, _req: &NarrativeRequest) -> Result<NarrativeOutput, NarrativeError> {
            Err(NarrativeError::InvalidOutput("not json".into()))
        }
    }

    async fn service_with_house() -> (HouseholdService, House) {
        let service = HouseholdService::new(Arc::new(MemoryStore::new()), SnapshotOptions::default());
        service.register_user("owner", "Olive", "olive@example.com").await.unwrap();
        let house = service
            .create_house(
                "owner",
                CreateHouse {
                    name: "  Maple Street ".into(),
                    monthly_goal: 300.0,
                    billing_cycle_start: BillingCycleStart {
                        date: START,
                        units: 15_000.0,
                    },
                },
            )
            .await
            .unwrap();
        (service, house)
    }

    async fn join(service: &HouseholdService, house: &House, uid: &str) {
        service.register_user(uid, uid, &format!("{uid}@example.com")).await.unwrap();
        let req = service.request_to_join(uid, &house.join_code).await.unwrap();
        service.resolve_request("owner", &req.request_id, true).await.unwrap();
    }

    #[test]
    fn join_codes_are_eight_alphanumerics() {
        let code = generate_join_code();
        assert_eq!(code.len(), JOIN_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn create_house_trims_name_and_rejects_second_house() {
        let (service, house) = service_with_house().await;
        assert_eq!(house.name, "Maple Street");

        let err = service
            .create_house(
                "owner",
                CreateHouse {
                    name: "Second".into(),
                    monthly_goal: 100.0,
                    billing_cycle_start: BillingCycleStart { date: START, units: 1.0 },
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyInHouse));
    }

    #[tokio::test]
    async fn create_house_validates_before_touching_store() {
        let service = HouseholdService::new(Arc::new(MemoryStore::new()), SnapshotOptions::default());
        let err = service
            .create_house(
                "nobody",
                CreateHouse {
                    name: "ab".into(),
                    monthly_goal: 300.0,
                    billing_cycle_start: BillingCycleStart { date: START, units: 0.0 },
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::HouseNameTooShort)
        ));
    }

    #[tokio::test]
    async fn dashboard_reflects_readings() {
        let (service, house) = service_with_house().await;
        service
            .add_reading("owner", &house.id, 15_180.0, START + Duration::days(28))
            .await
            .unwrap();

        let dash = service
            .dashboard("owner", &house.id, START + Duration::days(28))
            .await
            .unwrap();
        assert!(dash.is_owner);
        assert!((dash.snapshot.units_consumed - 180.0).abs() < 1e-9);
        assert!((dash.snapshot.units_left - 120.0).abs() < 1e-9);
        assert_eq!(dash.snapshot.days_elapsed, 28);
        assert_eq!(dash.five_level.status, PaceStatus::VeryLow);
        assert_eq!(dash.three_level.status, PaceStatus::OnTrack);
        assert_eq!(dash.pacing_guide.status, PaceStatus::VeryLow);
        assert_eq!(
            dash.pacing_guide.description,
            "Consumption is much lower than target pace. Excellent!"
        );
        assert_eq!(dash.pacing_guide.gauge_position, Some(20));
        assert_eq!(dash.days_since_last_reading, 0);
        assert_eq!(dash.series.len(), 2);
    }

    #[tokio::test]
    async fn readings_must_increase() {
        let (service, house) = service_with_house().await;
        let err = service
            .add_reading("owner", &house.id, 15_000.0, START + Duration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::ReadingNotIncreasing { .. })
        ));
    }

    #[tokio::test]
    async fn billing_start_reading_is_protected() {
        let (service, house) = service_with_house().await;
        let readings = service.readings("owner", &house.id).await.unwrap();
        let anchor = &readings[0];
        assert!(anchor.is_billing_cycle_start);

        let err = service.delete_reading("owner", &house.id, &anchor.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::ProtectedReading));

        let err = service
            .edit_reading("owner", &house.id, &anchor.id, 1.0, START)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ProtectedReading));
    }

    #[tokio::test]
    async fn edit_and_delete_ordinary_reading() {
        let (service, house) = service_with_house().await;
        let reading = service
            .add_reading("owner", &house.id, 15_050.0, START + Duration::days(2))
            .await
            .unwrap();

        service
            .edit_reading("owner", &house.id, &reading.id, 15_060.0, reading.date)
            .await
            .unwrap();
        let readings = service.readings("owner", &house.id).await.unwrap();
        assert_eq!(readings.last().map(|r| r.value), Some(15_060.0));

        service.delete_reading("owner", &house.id, &reading.id).await.unwrap();
        assert_eq!(service.readings("owner", &house.id).await.unwrap().len(), 1);

        let err = service.delete_reading("owner", &house.id, &reading.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::ReadingNotFound(_)));
    }

    #[tokio::test]
    async fn rebase_moves_cycle_start() {
        let (service, house) = service_with_house().await;
        service
            .add_reading("owner", &house.id, 15_300.0, START + Duration::days(30))
            .await
            .unwrap();
        let new_start = BillingCycleStart {
            date: START + Duration::days(31),
            units: 15_310.0,
        };
        service.rebase_billing_cycle("owner", &house.id, new_start).await.unwrap();
        service
            .add_reading("owner", &house.id, 15_350.0, START + Duration::days(35))
            .await
            .unwrap();

        let dash = service
            .dashboard("owner", &house.id, START + Duration::days(35))
            .await
            .unwrap();
        assert_eq!(dash.snapshot.cycle_start_date, new_start.date);
        assert!((dash.snapshot.units_consumed - 40.0).abs() < 1e-9);
        assert_eq!(dash.house.billing_cycle_start, new_start);
    }

    #[tokio::test]
    async fn only_owner_changes_settings() {
        let (service, house) = service_with_house().await;
        join(&service, &house, "maya").await;

        let err = service.update_goal("maya", &house.id, 500.0).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotOwner));

        service.update_goal("owner", &house.id, 500.0).await.unwrap();
        let dash = service.dashboard("maya", &house.id, START).await.unwrap();
        assert!(!dash.is_owner);
        assert_eq!(dash.house.monthly_goal, 500.0);
    }

    #[tokio::test]
    async fn outsiders_cannot_read_house() {
        let (service, house) = service_with_house().await;
        service.register_user("eve", "Eve", "eve@example.com").await.unwrap();
        let err = service.readings("eve", &house.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotMember));
    }

    #[tokio::test]
    async fn join_flow_approve_and_remove() {
        let (service, house) = service_with_house().await;
        service.register_user("maya", "Maya", "maya@example.com").await.unwrap();

        let req = service.request_to_join("maya", &house.join_code).await.unwrap();
        let err = service.request_to_join("maya", &house.join_code).await.unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateRequest));

        let pending = service.pending_requests("owner", &house.id).await.unwrap();
        assert_eq!(pending.len(), 1);

        service.resolve_request("owner", &req.request_id, true).await.unwrap();
        assert_eq!(service.members("maya", &house.id).await.unwrap().len(), 2);
        assert!(service.pending_requests("owner", &house.id).await.unwrap().is_empty());

        let err = service.remove_member("owner", &house.id, "owner").await.unwrap_err();
        assert!(matches!(err, ServiceError::CannotRemoveOwner));

        service.remove_member("owner", &house.id, "maya").await.unwrap();
        assert_eq!(service.members("owner", &house.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_request_leaves_requester_houseless() {
        let (service, house) = service_with_house().await;
        service.register_user("maya", "Maya", "maya@example.com").await.unwrap();
        let req = service.request_to_join("maya", &house.join_code).await.unwrap();

        let err = service.resolve_request("maya", &req.request_id, false).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotMember));

        service.resolve_request("owner", &req.request_id, false).await.unwrap();
        let err = service.members("maya", &house.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotMember));
    }

    #[tokio::test]
    async fn unknown_join_code() {
        let (service, _) = service_with_house().await;
        service.register_user("maya", "Maya", "maya@example.com").await.unwrap();
        let err = service.request_to_join("maya", "ZZZZZZZZ").await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownJoinCode));

        let err = service.request_to_join("maya", "short").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::JoinCodeLength)
        ));
    }

    #[tokio::test]
    async fn assess_requires_configured_narrative() {
        let (service, house) = service_with_house().await;
        let err = service.assess("owner", &house.id, START).await.unwrap_err();
        assert!(matches!(err, ServiceError::NarrativeUnavailable));
    }

    #[tokio::test]
    async fn assess_keeps_calculator_status() {
        let (service, house) = service_with_house().await;
        let service = service.with_narrative(Arc::new(FixedNarrative("High")));
        service
            .add_reading("owner", &house.id, 15_180.0, START + Duration::days(28))
            .await
            .unwrap();

        let report = service
            .assess("owner", &house.id, START + Duration::days(28))
            .await
            .unwrap();
        assert_eq!(report.status, PaceStatus::OnTrack);
        assert_eq!(report.narrative_status, Some(PaceStatus::High));
        assert!(!report.agrees);
        assert!(report.available);
        assert_eq!(report.explanation, "180 units so far");
    }

    #[tokio::test]
    async fn assess_falls_back_on_failure() {
        let (service, house) = service_with_house().await;
        let service = service.with_narrative(Arc::new(BrokenNarrative));
        let report = service
            .assess("owner", &house.id, START + Duration::days(3))
            .await
            .unwrap();
        assert!(!report.available);
        assert_eq!(report.narrative_label, FALLBACK_LABEL);
    }
}
