use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::engine::EngineError;
use crate::model::AllocationKind;
use crate::observability;

/// Structured error body. Conflicts additionally carry the requested range,
/// property and conflicting kind so clients can render their own messages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictDetails>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetails {
    pub property_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub conflicting_kind: AllocationKind,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub problem: Problem,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            problem: Problem {
                code: "validation_error",
                message: message.into(),
                conflict: None,
            },
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(id) => Self {
                status: StatusCode::NOT_FOUND,
                problem: Problem {
                    code: "not_found",
                    message: format!("not found: {id}"),
                    conflict: None,
                },
            },
            EngineError::InvalidInput(msg) => Self {
                status: StatusCode::BAD_REQUEST,
                problem: Problem {
                    code: "validation_error",
                    message: msg.to_string(),
                    conflict: None,
                },
            },
            EngineError::LimitExceeded(msg) => Self {
                status: StatusCode::BAD_REQUEST,
                problem: Problem {
                    code: "limit_exceeded",
                    message: msg.to_string(),
                    conflict: None,
                },
            },
            EngineError::Conflict {
                property_id,
                range,
                with,
            } => {
                metrics::counter!(observability::CONFLICTS_TOTAL, "with" => with.to_string())
                    .increment(1);
                let message = match with {
                    AllocationKind::Booking => format!(
                        "dates {} to {} on property {property_id} are already booked",
                        range.start, range.end
                    ),
                    AllocationKind::Block => format!(
                        "dates {} to {} on property {property_id} are blocked",
                        range.start, range.end
                    ),
                };
                Self {
                    status: StatusCode::CONFLICT,
                    problem: Problem {
                        code: "allocation_conflict",
                        message,
                        conflict: Some(ConflictDetails {
                            property_id,
                            start_date: range.start,
                            end_date: range.end,
                            conflicting_kind: with,
                        }),
                    },
                }
            }
            EngineError::WalError(e) => {
                tracing::error!("storage failure: {e}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    problem: Problem {
                        code: "internal",
                        message: "internal storage failure".into(),
                        conflict: None,
                    },
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.problem)).into_response()
    }
}
