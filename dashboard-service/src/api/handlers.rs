use axum::{extract::State, http::StatusCode, Json};
use meter_client::domain::{BillingCycleStart, House, JoinRequest, Reading, User};
use serde::Deserialize;
use time::OffsetDateTime;

use super::extract::{JsonBody, PathParams, QueryParams};
use super::{ApiError, AppState, Caller};
use crate::narrative::NarrativeReport;
use crate::service::{CreateHouse, Dashboard};

type ApiResult<T> = Result<T, ApiError>;

/// Optional evaluation instant; absent means the wall clock.
#[derive(Debug, Default, Deserialize)]
pub struct AtQuery {
    #[serde(default, with = "time::serde::rfc3339::option")]
    now: Option<OffsetDateTime>,
}

impl AtQuery {
    fn instant(&self) -> OffsetDateTime {
        self.now.unwrap_or_else(OffsetDateTime::now_utc)
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterUser {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
pub struct Rename {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGoal {
    monthly_goal: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReadingBody {
    value: f64,
    #[serde(with = "time::serde::rfc3339")]
    date: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct JoinBody {
    join_code: String,
}

pub async fn register_user(
    State(state): State<AppState>,
    Caller(uid): Caller,
    JsonBody(body): JsonBody<RegisterUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.service.register_user(&uid, &body.name, &body.email).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn rename_user(
    State(state): State<AppState>,
    Caller(uid): Caller,
    JsonBody(body): JsonBody<Rename>,
) -> ApiResult<StatusCode> {
    state.service.rename_user(&uid, &body.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_house(
    State(state): State<AppState>,
    Caller(uid): Caller,
    JsonBody(body): JsonBody<CreateHouse>,
) -> ApiResult<(StatusCode, Json<House>)> {
    let house = state.service.create_house(&uid, body).await?;
    Ok((StatusCode::CREATED, Json(house)))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
    QueryParams(at): QueryParams<AtQuery>,
) -> ApiResult<Json<Dashboard>> {
    let dashboard = state.service.dashboard(&uid, &house_id, at.instant()).await?;
    Ok(Json(dashboard))
}

pub async fn rename_house(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
    JsonBody(body): JsonBody<Rename>,
) -> ApiResult<StatusCode> {
    state.service.rename_house(&uid, &house_id, &body.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_goal(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
    JsonBody(body): JsonBody<UpdateGoal>,
) -> ApiResult<StatusCode> {
    state.service.update_goal(&uid, &house_id, body.monthly_goal).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rebase_billing_cycle(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
    JsonBody(body): JsonBody<BillingCycleStart>,
) -> ApiResult<Json<Reading>> {
    let reading = state.service.rebase_billing_cycle(&uid, &house_id, body).await?;
    Ok(Json(reading))
}

pub async fn list_readings(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
) -> ApiResult<Json<Vec<Reading>>> {
    Ok(Json(state.service.readings(&uid, &house_id).await?))
}

pub async fn add_reading(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
    JsonBody(body): JsonBody<ReadingBody>,
) -> ApiResult<(StatusCode, Json<Reading>)> {
    let reading = state
        .service
        .add_reading(&uid, &house_id, body.value, body.date)
        .await?;
    Ok((StatusCode::CREATED, Json(reading)))
}

pub async fn edit_reading(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams((house_id, reading_id)): PathParams<(String, String)>,
    JsonBody(body): JsonBody<ReadingBody>,
) -> ApiResult<StatusCode> {
    state
        .service
        .edit_reading(&uid, &house_id, &reading_id, body.value, body.date)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_reading(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams((house_id, reading_id)): PathParams<(String, String)>,
) -> ApiResult<StatusCode> {
    state.service.delete_reading(&uid, &house_id, &reading_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn members(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.service.members(&uid, &house_id).await?))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams((house_id, member_uid)): PathParams<(String, String)>,
) -> ApiResult<StatusCode> {
    state.service.remove_member(&uid, &house_id, &member_uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn request_to_join(
    State(state): State<AppState>,
    Caller(uid): Caller,
    JsonBody(body): JsonBody<JoinBody>,
) -> ApiResult<(StatusCode, Json<JoinRequest>)> {
    let request = state.service.request_to_join(&uid, &body.join_code).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn pending_requests(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
) -> ApiResult<Json<Vec<JoinRequest>>> {
    Ok(Json(state.service.pending_requests(&uid, &house_id).await?))
}

pub async fn approve_request(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(request_id): PathParams<String>,
) -> ApiResult<StatusCode> {
    state.service.resolve_request(&uid, &request_id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reject_request(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(request_id): PathParams<String>,
) -> ApiResult<StatusCode> {
    state.service.resolve_request(&uid, &request_id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assess(
    State(state): State<AppState>,
    Caller(uid): Caller,
    PathParams(house_id): PathParams<String>,
    QueryParams(at): QueryParams<AtQuery>,
) -> ApiResult<Json<NarrativeReport>> {
    Ok(Json(state.service.assess(&uid, &house_id, at.instant()).await?))
}
