use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use super::store::{new_id, HouseStore, StoreError, StoreResult};
use crate::domain::{BillingCycleStart, House, JoinRequest, JoinRequestStatus, NewHouse, NewReading, Reading, User};

/// `HouseStore` backed by the tables in `sql/schema/01_dashboard.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct HouseRow {
    id: String,
    name: String,
    owner_id: String,
    join_code: String,
    monthly_goal: f64,
    billing_start_date: OffsetDateTime,
    billing_start_units: f64,
}

impl From<HouseRow> for House {
    fn from(r: HouseRow) -> Self {
        House {
            id: r.id,
            name: r.name,
            owner_id: r.owner_id,
            join_code: r.join_code,
            monthly_goal: r.monthly_goal,
            billing_cycle_start: BillingCycleStart {
                date: r.billing_start_date,
                units: r.billing_start_units,
            },
        }
    }
}

/// Postgres caps a statement at 65535 bind parameters; each reading row uses 5.
const MAX_READINGS_PER_INSERT: usize = u16::MAX as usize / 5;

const HOUSE_COLUMNS: &str =
    "id, name, owner_id, join_code, monthly_goal, billing_start_date, billing_start_units";

fn expect_one(rows_affected: u64, entity: &'static str, id: &str) -> StoreResult<()> {
    if rows_affected == 0 {
        Err(StoreError::not_found(entity, id))
    } else {
        Ok(())
    }
}

fn map_unique_violation(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(format!("{what} already exists")),
        _ => StoreError::Database(e),
    }
}

#[async_trait::async_trait]
impl HouseStore for PgStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (uid, name, email, house_id) VALUES ($1, $2, $3, $4)")
            .bind(&user.uid)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.house_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "user"))?;
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT uid, name, email, house_id FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user_name(&self, uid: &str, name: &str) -> StoreResult<()> {
        let res = sqlx::query("UPDATE users SET name = $2 WHERE uid = $1")
            .bind(uid)
            .bind(name)
            .execute(&self.pool)
            .await?;
        expect_one(res.rows_affected(), "user", uid)
    }

    async fn set_user_house(&self, uid: &str, house_id: Option<&str>) -> StoreResult<()> {
        let res = sqlx::query("UPDATE users SET house_id = $2 WHERE uid = $1")
            .bind(uid)
            .bind(house_id)
            .execute(&self.pool)
            .await?;
        expect_one(res.rows_affected(), "user", uid)
    }

    async fn create_house(&self, house: NewHouse) -> StoreResult<House> {
        let id = new_id();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, HouseRow>(&format!(
            r#"
            INSERT INTO houses (id, name, owner_id, join_code, monthly_goal, billing_start_date, billing_start_units)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {HOUSE_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(&house.name)
        .bind(&house.owner_id)
        .bind(&house.join_code)
        .bind(house.monthly_goal)
        .bind(house.billing_cycle_start.date)
        .bind(house.billing_cycle_start.units)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "join code"))?;

        let res = sqlx::query("UPDATE users SET house_id = $2 WHERE uid = $1")
            .bind(&house.owner_id)
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        expect_one(res.rows_affected(), "user", &house.owner_id)?;

        let initial = house.billing_cycle_start.as_reading();
        sqlx::query(
            "INSERT INTO readings (id, house_id, value, read_at, is_billing_cycle_start) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(new_id())
        .bind(&id)
        .bind(initial.value)
        .bind(initial.date)
        .bind(initial.is_billing_cycle_start)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn get_house(&self, house_id: &str) -> StoreResult<Option<House>> {
        let row = sqlx::query_as::<_, HouseRow>(&format!("SELECT {HOUSE_COLUMNS} FROM houses WHERE id = $1"))
            .bind(house_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(House::from))
    }

    async fn get_house_by_join_code(&self, join_code: &str) -> StoreResult<Option<House>> {
        let row = sqlx::query_as::<_, HouseRow>(&format!(
            "SELECT {HOUSE_COLUMNS} FROM houses WHERE join_code = $1 LIMIT 1"
        ))
        .bind(join_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(House::from))
    }

    async fn get_house_members(&self, house_id: &str) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT uid, name, email, house_id FROM users WHERE house_id = $1 ORDER BY name, uid",
        )
        .bind(house_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_house_name(&self, house_id: &str, name: &str) -> StoreResult<()> {
        let res = sqlx::query("UPDATE houses SET name = $2 WHERE id = $1")
            .bind(house_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        expect_one(res.rows_affected(), "house", house_id)
    }

    async fn update_monthly_goal(&self, house_id: &str, monthly_goal: f64) -> StoreResult<()> {
        let res = sqlx::query("UPDATE houses SET monthly_goal = $2 WHERE id = $1")
            .bind(house_id)
            .bind(monthly_goal)
            .execute(&self.pool)
            .await?;
        expect_one(res.rows_affected(), "house", house_id)
    }

    async fn rebase_billing_cycle(&self, house_id: &str, start: BillingCycleStart) -> StoreResult<Reading> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query("UPDATE houses SET billing_start_date = $2, billing_start_units = $3 WHERE id = $1")
            .bind(house_id)
            .bind(start.date)
            .bind(start.units)
            .execute(&mut *tx)
            .await?;
        expect_one(res.rows_affected(), "house", house_id)?;

        let reading = start.as_reading().with_id(new_id());
        sqlx::query(
            "INSERT INTO readings (id, house_id, value, read_at, is_billing_cycle_start) VALUES ($1, $2, $3, $4, TRUE)",
        )
        .bind(&reading.id)
        .bind(house_id)
        .bind(reading.value)
        .bind(reading.date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reading)
    }

    async fn add_reading(&self, house_id: &str, reading: NewReading) -> StoreResult<Reading> {
        let reading = reading.with_id(new_id());
        sqlx::query(
            "INSERT INTO readings (id, house_id, value, read_at, is_billing_cycle_start) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&reading.id)
        .bind(house_id)
        .bind(reading.value)
        .bind(reading.date)
        .bind(reading.is_billing_cycle_start)
        .execute(&self.pool)
        .await?;
        Ok(reading)
    }

    async fn add_readings_idempotent(&self, house_id: &str, readings: &[Reading]) -> StoreResult<u64> {
        let mut inserted = 0;
        for chunk in readings.chunks(MAX_READINGS_PER_INSERT) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO readings (id, house_id, value, read_at, is_billing_cycle_start) ",
            );
            builder.push_values(chunk, |mut b, r| {
                b.push_bind(&r.id)
                    .push_bind(house_id)
                    .push_bind(r.value)
                    .push_bind(r.date)
                    .push_bind(r.is_billing_cycle_start);
            });
            builder.push(" ON CONFLICT (id) DO NOTHING");

            inserted += builder.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(inserted)
    }

    async fn get_readings(&self, house_id: &str) -> StoreResult<Vec<Reading>> {
        let rows = sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, value, read_at, is_billing_cycle_start
            FROM readings
            WHERE house_id = $1
            ORDER BY read_at
            "#,
        )
        .bind(house_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_reading(&self, house_id: &str, reading_id: &str) -> StoreResult<Option<Reading>> {
        let row = sqlx::query_as::<_, Reading>(
            "SELECT id, value, read_at, is_billing_cycle_start FROM readings WHERE house_id = $1 AND id = $2",
        )
        .bind(house_id)
        .bind(reading_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_reading(
        &self,
        house_id: &str,
        reading_id: &str,
        value: f64,
        date: OffsetDateTime,
    ) -> StoreResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE readings SET value = $3, read_at = $4
            WHERE house_id = $1 AND id = $2 AND NOT is_billing_cycle_start
            "#,
        )
        .bind(house_id)
        .bind(reading_id)
        .bind(value)
        .bind(date)
        .execute(&self.pool)
        .await?;
        expect_one(res.rows_affected(), "reading", reading_id)
    }

    async fn delete_reading(&self, house_id: &str, reading_id: &str) -> StoreResult<()> {
        let res = sqlx::query("DELETE FROM readings WHERE house_id = $1 AND id = $2 AND NOT is_billing_cycle_start")
            .bind(house_id)
            .bind(reading_id)
            .execute(&self.pool)
            .await?;
        expect_one(res.rows_affected(), "reading", reading_id)
    }

    async fn create_join_request(
        &self,
        house_id: &str,
        requester_id: &str,
        requester_name: &str,
    ) -> StoreResult<JoinRequest> {
        let request = sqlx::query_as::<_, JoinRequest>(
            r#"
            INSERT INTO join_requests (request_id, house_id, requester_id, requester_name, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING request_id, house_id, requester_id, requester_name, status
            "#,
        )
        .bind(new_id())
        .bind(house_id)
        .bind(requester_id)
        .bind(requester_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    async fn get_pending_join_requests(&self, house_id: &str) -> StoreResult<Vec<JoinRequest>> {
        let rows = sqlx::query_as::<_, JoinRequest>(
            r#"
            SELECT request_id, house_id, requester_id, requester_name, status
            FROM join_requests
            WHERE house_id = $1 AND status = 'pending'
            ORDER BY created_at
            "#,
        )
        .bind(house_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_join_request(&self, request_id: &str) -> StoreResult<Option<JoinRequest>> {
        let row = sqlx::query_as::<_, JoinRequest>(
            "SELECT request_id, house_id, requester_id, requester_name, status FROM join_requests WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn resolve_join_request(&self, request_id: &str, status: JoinRequestStatus) -> StoreResult<()> {
        if status == JoinRequestStatus::Pending {
            return Err(StoreError::Conflict("a join request can only be resolved as approved or rejected".into()));
        }

        let mut tx = self.pool.begin().await?;

        // Resolved requests are deleted rather than kept with a final status.
        let request = sqlx::query_as::<_, JoinRequest>(
            r#"
            DELETE FROM join_requests WHERE request_id = $1
            RETURNING request_id, house_id, requester_id, requester_name, status
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("join request", request_id))?;

        if status == JoinRequestStatus::Approved {
            let res = sqlx::query("UPDATE users SET house_id = $2 WHERE uid = $1")
                .bind(&request.requester_id)
                .bind(&request.house_id)
                .execute(&mut *tx)
                .await?;
            expect_one(res.rows_affected(), "user", &request.requester_id)?;
        }

        tx.commit().await?;
        Ok(())
    }
}
