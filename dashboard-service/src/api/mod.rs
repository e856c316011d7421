//! JSON API over `HouseholdService`.
//!
//! The caller's identity arrives from the upstream auth provider in the
//! `x-user-id` header. When a bearer token is configured every request must
//! also present it.

mod error;
mod extract;
mod handlers;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};

use crate::service::HouseholdService;

pub use error::ApiError;

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<HouseholdService>,
    pub auth_bearer_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: Arc<HouseholdService>, auth_bearer_token: Option<String>) -> Self {
        Self {
            service,
            auth_bearer_token: auth_bearer_token.map(Arc::from),
        }
    }
}

/// Authenticated caller uid.
pub struct Caller(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(expected) = state.auth_bearer_token.as_deref() {
            let presented = parts
                .headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "));
            if presented != Some(expected) {
                return Err(ApiError::Unauthorized);
            }
        }

        let uid = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::MissingCaller)?;
        Ok(Caller(uid.to_string()))
    }
}

async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let response = next.run(req).await;
    let status = response.status().as_u16().to_string();
    metrics::counter!("http_requests_total", "method" => method, "status" => status).increment(1);
    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(handlers::register_user))
        .route("/users/me/name", put(handlers::rename_user))
        .route("/houses", post(handlers::create_house))
        .route("/houses/:house_id/dashboard", get(handlers::dashboard))
        .route("/houses/:house_id/name", put(handlers::rename_house))
        .route("/houses/:house_id/goal", put(handlers::update_goal))
        .route("/houses/:house_id/billing-cycle", put(handlers::rebase_billing_cycle))
        .route(
            "/houses/:house_id/readings",
            get(handlers::list_readings).post(handlers::add_reading),
        )
        .route(
            "/houses/:house_id/readings/:reading_id",
            put(handlers::edit_reading).delete(handlers::delete_reading),
        )
        .route("/houses/:house_id/members", get(handlers::members))
        .route("/houses/:house_id/members/:uid", delete(handlers::remove_member))
        .route("/houses/:house_id/join-requests", get(handlers::pending_requests))
        .route("/houses/:house_id/assessment", post(handlers::assess))
        .route("/join-requests", post(handlers::request_to_join))
        .route("/join-requests/:request_id/approve", post(handlers::approve_request))
        .route("/join-requests/:request_id/reject", post(handlers::reject_request))
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http bind address: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dashboard API listening");
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_client::{MemoryStore, SnapshotOptions};
    use serde_json::{json, Value};

    async fn spawn(token: Option<&str>) -> String {
        let service = HouseholdService::new(Arc::new(MemoryStore::new()), SnapshotOptions::default());
        let state = AppState::new(Arc::new(service), token.map(str::to_string));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state).into_make_service()).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn create_house(client: &reqwest::Client, base: &str) -> Value {
        let resp = client
            .post(format!("{base}/users"))
            .header(USER_HEADER, "owner")
            .json(&json!({ "name": "Olive", "email": "olive@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

        let resp = client
            .post(format!("{base}/houses"))
            .header(USER_HEADER, "owner")
            .json(&json!({
                "name": "Maple Street",
                "monthly_goal": 300.0,
                "billing_cycle_start": { "date": "2024-03-01T00:00:00Z", "units": 15000.0 }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        resp.json().await.unwrap()
    }

    #[tokio::test]
    async fn reading_then_dashboard() {
        let base = spawn(None).await;
        let client = reqwest::Client::new();
        let house = create_house(&client, &base).await;
        let id = house["id"].as_str().unwrap();

        let resp = client
            .post(format!("{base}/houses/{id}/readings"))
            .header(USER_HEADER, "owner")
            .json(&json!({ "value": 15180.0, "date": "2024-03-29T00:00:00Z" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

        let dash: Value = client
            .get(format!("{base}/houses/{id}/dashboard?now=2024-03-29T00:00:00Z"))
            .header(USER_HEADER, "owner")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(dash["snapshot"]["units_consumed"], json!(180.0));
        assert_eq!(dash["snapshot"]["days_elapsed"], json!(28));
        assert_eq!(dash["five_level"]["status"], json!("very_low"));
        assert_eq!(dash["is_owner"], json!(true));
    }

    #[tokio::test]
    async fn error_statuses() {
        let base = spawn(None).await;
        let client = reqwest::Client::new();
        let house = create_house(&client, &base).await;
        let id = house["id"].as_str().unwrap();

        let resp = client.get(format!("{base}/houses/{id}/readings")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        let resp = client
            .put(format!("{base}/houses/{id}/goal"))
            .header(USER_HEADER, "owner")
            .json(&json!({ "monthly_goal": 0.5 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());

        client
            .post(format!("{base}/users"))
            .header(USER_HEADER, "eve")
            .json(&json!({ "name": "Eve", "email": "eve@example.com" }))
            .send()
            .await
            .unwrap();
        let resp = client
            .get(format!("{base}/houses/{id}/members"))
            .header(USER_HEADER, "eve")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);

        let resp = client
            .post(format!("{base}/houses/{id}/assessment"))
            .header(USER_HEADER, "owner")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn malformed_input_gets_json_error_body() {
        let base = spawn(None).await;
        let client = reqwest::Client::new();
        let house = create_house(&client, &base).await;
        let id = house["id"].as_str().unwrap();

        let resp = client
            .post(format!("{base}/houses/{id}/readings"))
            .header(USER_HEADER, "owner")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());

        let resp = client
            .post(format!("{base}/houses/{id}/readings"))
            .header(USER_HEADER, "owner")
            .json(&json!({ "value": "lots" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());

        let resp = client
            .get(format!("{base}/houses/{id}/dashboard?now=yesterday"))
            .header(USER_HEADER, "owner")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn bearer_token_enforced() {
        let base = spawn(Some("s3cret")).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/users"))
            .header(USER_HEADER, "owner")
            .json(&json!({ "name": "Olive", "email": "olive@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        let resp = client
            .post(format!("{base}/users"))
            .header(USER_HEADER, "owner")
            .bearer_auth("s3cret")
            .json(&json!({ "name": "Olive", "email": "olive@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    }
}
