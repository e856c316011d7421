use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meter_client::db::StoreError;

use crate::service::ServiceError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("missing x-user-id header")]
    MissingCaller,
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::MissingCaller => StatusCode::UNAUTHORIZED,
            Self::Rejected { status, .. } => *status,
            Self::Service(e) => match e {
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::UnknownUser(_)
                | ServiceError::HouseNotFound(_)
                | ServiceError::ReadingNotFound(_)
                | ServiceError::RequestNotFound(_)
                | ServiceError::UnknownJoinCode => StatusCode::NOT_FOUND,
                ServiceError::NotMember
                | ServiceError::NotOwner
                | ServiceError::ProtectedReading
                | ServiceError::CannotRemoveOwner => StatusCode::FORBIDDEN,
                ServiceError::AlreadyInHouse | ServiceError::DuplicateRequest => StatusCode::CONFLICT,
                ServiceError::NarrativeUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
                ServiceError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
                ServiceError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self::Rejected {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self {
        Self::Rejected {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self {
        Self::Rejected {
            status: r.status(),
            message: r.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        // Database details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
