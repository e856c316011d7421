use std::collections::HashMap;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::store::{new_id, HouseStore, StoreError, StoreResult};
use crate::domain::{BillingCycleStart, House, JoinRequest, JoinRequestStatus, NewHouse, NewReading, Reading, User};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    houses: HashMap<String, House>,
    readings: HashMap<String, Vec<Reading>>,
    // Insertion order doubles as creation order.
    join_requests: Vec<JoinRequest>,
}

/// In-process `HouseStore`. Every operation runs under a single lock, so the
/// multi-record operations are atomic for free.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn user_mut(&mut self, uid: &str) -> StoreResult<&mut User> {
        self.users.get_mut(uid).ok_or_else(|| StoreError::not_found("user", uid))
    }

    fn house_mut(&mut self, house_id: &str) -> StoreResult<&mut House> {
        self.houses
            .get_mut(house_id)
            .ok_or_else(|| StoreError::not_found("house", house_id))
    }

    fn editable_reading_mut(&mut self, house_id: &str, reading_id: &str) -> StoreResult<&mut Reading> {
        self.readings
            .get_mut(house_id)
            .and_then(|rs| rs.iter_mut().find(|r| r.id == reading_id && !r.is_billing_cycle_start))
            .ok_or_else(|| StoreError::not_found("reading", reading_id))
    }
}

#[async_trait::async_trait]
impl HouseStore for MemoryStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.uid) {
            return Err(StoreError::Conflict("user already exists".into()));
        }
        inner.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(uid).cloned())
    }

    async fn update_user_name(&self, uid: &str, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_mut(uid)?.name = name.to_string();
        Ok(())
    }

    async fn set_user_house(&self, uid: &str, house_id: Option<&str>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.user_mut(uid)?.house_id = house_id.map(str::to_string);
        Ok(())
    }

    async fn create_house(&self, house: NewHouse) -> StoreResult<House> {
        let mut inner = self.inner.write().await;
        if inner.houses.values().any(|h| h.join_code == house.join_code) {
            return Err(StoreError::Conflict("join code already exists".into()));
        }

        let id = new_id();
        inner.user_mut(&house.owner_id)?.house_id = Some(id.clone());

        let created = House {
            id: id.clone(),
            name: house.name,
            owner_id: house.owner_id,
            join_code: house.join_code,
            monthly_goal: house.monthly_goal,
            billing_cycle_start: house.billing_cycle_start,
        };
        inner.houses.insert(id.clone(), created.clone());
        inner
            .readings
            .insert(id, vec![created.billing_cycle_start.as_reading().with_id(new_id())]);

        Ok(created)
    }

    async fn get_house(&self, house_id: &str) -> StoreResult<Option<House>> {
        Ok(self.inner.read().await.houses.get(house_id).cloned())
    }

    async fn get_house_by_join_code(&self, join_code: &str) -> StoreResult<Option<House>> {
        let inner = self.inner.read().await;
        Ok(inner.houses.values().find(|h| h.join_code == join_code).cloned())
    }

    async fn get_house_members(&self, house_id: &str) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut members: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.house_id.as_deref() == Some(house_id))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.uid.cmp(&b.uid)));
        Ok(members)
    }

    async fn update_house_name(&self, house_id: &str, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.house_mut(house_id)?.name = name.to_string();
        Ok(())
    }

    async fn update_monthly_goal(&self, house_id: &str, monthly_goal: f64) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.house_mut(house_id)?.monthly_goal = monthly_goal;
        Ok(())
    }

    async fn rebase_billing_cycle(&self, house_id: &str, start: BillingCycleStart) -> StoreResult<Reading> {
        let mut inner = self.inner.write().await;
        inner.house_mut(house_id)?.billing_cycle_start = start;

        let reading = start.as_reading().with_id(new_id());
        inner
            .readings
            .entry(house_id.to_string())
            .or_default()
            .push(reading.clone());
        Ok(reading)
    }

    async fn add_reading(&self, house_id: &str, reading: NewReading) -> StoreResult<Reading> {
        let mut inner = self.inner.write().await;
        if !inner.houses.contains_key(house_id) {
            return Err(StoreError::not_found("house", house_id));
        }

        let reading = reading.with_id(new_id());
        inner
            .readings
            .entry(house_id.to_string())
            .or_default()
            .push(reading.clone());
        Ok(reading)
    }

    async fn add_readings_idempotent(&self, house_id: &str, readings: &[Reading]) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        if !inner.houses.contains_key(house_id) {
            return Err(StoreError::not_found("house", house_id));
        }

        let existing = inner.readings.entry(house_id.to_string()).or_default();
        let mut inserted = 0;
        for r in readings {
            if existing.iter().any(|e| e.id == r.id) {
                continue;
            }
            existing.push(r.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn get_readings(&self, house_id: &str) -> StoreResult<Vec<Reading>> {
        let inner = self.inner.read().await;
        let mut readings = inner.readings.get(house_id).cloned().unwrap_or_default();
        readings.sort_by_key(|r| r.date);
        Ok(readings)
    }

    async fn get_reading(&self, house_id: &str, reading_id: &str) -> StoreResult<Option<Reading>> {
        let inner = self.inner.read().await;
        Ok(inner
            .readings
            .get(house_id)
            .and_then(|rs| rs.iter().find(|r| r.id == reading_id))
            .cloned())
    }

    async fn update_reading(
        &self,
        house_id: &str,
        reading_id: &str,
        value: f64,
        date: OffsetDateTime,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let reading = inner.editable_reading_mut(house_id, reading_id)?;
        reading.value = value;
        reading.date = date;
        Ok(())
    }

    async fn delete_reading(&self, house_id: &str, reading_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.editable_reading_mut(house_id, reading_id)?;
        if let Some(rs) = inner.readings.get_mut(house_id) {
            rs.retain(|r| r.id != reading_id);
        }
        Ok(())
    }

    async fn create_join_request(
        &self,
        house_id: &str,
        requester_id: &str,
        requester_name: &str,
    ) -> StoreResult<JoinRequest> {
        let mut inner = self.inner.write().await;
        if !inner.houses.contains_key(house_id) {
            return Err(StoreError::not_found("house", house_id));
        }

        let request = JoinRequest {
            request_id: new_id(),
            house_id: house_id.to_string(),
            requester_id: requester_id.to_string(),
            requester_name: requester_name.to_string(),
            status: JoinRequestStatus::Pending,
        };
        inner.join_requests.push(request.clone());
        Ok(request)
    }

    async fn get_pending_join_requests(&self, house_id: &str) -> StoreResult<Vec<JoinRequest>> {
        let inner = self.inner.read().await;
        Ok(inner
            .join_requests
            .iter()
            .filter(|r| r.house_id == house_id && r.status == JoinRequestStatus::Pending)
            .cloned()
            .collect())
    }

    async fn get_join_request(&self, request_id: &str) -> StoreResult<Option<JoinRequest>> {
        let inner = self.inner.read().await;
        Ok(inner.join_requests.iter().find(|r| r.request_id == request_id).cloned())
    }

    async fn resolve_join_request(&self, request_id: &str, status: JoinRequestStatus) -> StoreResult<()> {
        if status == JoinRequestStatus::Pending {
            return Err(StoreError::Conflict("a join request can only be resolved as approved or rejected".into()));
        }

        let mut inner = self.inner.write().await;
        let idx = inner
            .join_requests
            .iter()
            .position(|r| r.request_id == request_id)
            .ok_or_else(|| StoreError::not_found("join request", request_id))?;

        if status == JoinRequestStatus::Approved {
            let (requester_id, house_id) = {
                let r = &inner.join_requests[idx];
                (r.requester_id.clone(), r.house_id.clone())
            };
            inner.user_mut(&requester_id)?.house_id = Some(house_id);
        }

        inner.join_requests.remove(idx);
        Ok(())
    }
}
