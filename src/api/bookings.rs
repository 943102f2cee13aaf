use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::Engine;
use crate::model::{month_range, Booking, BookingStatus, DateRange};
use crate::observability;

use super::error::ApiError;

pub fn routes() -> Router<Arc<Engine>> {
    Router::new()
        .route("/", post(create))
        .route("/calendar", get(calendar))
        .route("/{id}", get(get_one).put(update).delete(delete_one))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/rebook", post(rebook))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub property_id: String,
    pub guest_name: String,
    pub guest_email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub guest_name: String,
    pub guest_email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Ulid,
    pub property_id: String,
    pub guest_name: String,
    pub guest_email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            property_id: b.property_id,
            guest_name: b.guest_name,
            guest_email: b.guest_email,
            start_date: b.range.start,
            end_date: b.range.end,
            status: b.status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub property_id: String,
    pub year: i32,
    pub month: u32,
}

async fn create(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let started = Instant::now();
    let result = engine
        .create_booking(
            req.property_id,
            req.guest_name,
            req.guest_email,
            DateRange {
                start: req.start_date,
                end: req.end_date,
            },
        )
        .await;
    observability::track("create_booking", started, &result);
    Ok((StatusCode::CREATED, Json(result?.into())))
}

async fn get_one(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
) -> Result<Json<BookingResponse>, ApiError> {
    Ok(Json(engine.get_booking(id)?.into()))
}

async fn update(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let started = Instant::now();
    let result = engine
        .update_booking(
            id,
            req.guest_name,
            req.guest_email,
            DateRange {
                start: req.start_date,
                end: req.end_date,
            },
        )
        .await;
    observability::track("update_booking", started, &result);
    Ok(Json(result?.into()))
}

async fn cancel(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let started = Instant::now();
    let result = engine.cancel_booking(id).await;
    observability::track("cancel_booking", started, &result);
    Ok(Json(result?.into()))
}

async fn rebook(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let started = Instant::now();
    let result = engine.rebook_booking(id).await;
    observability::track("rebook_booking", started, &result);
    Ok(Json(result?.into()))
}

async fn delete_one(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
) -> Result<StatusCode, ApiError> {
    let started = Instant::now();
    let result = engine.delete_booking(id).await;
    observability::track("delete_booking", started, &result);
    result?;
    Ok(StatusCode::NO_CONTENT)
}

async fn calendar(
    State(engine): State<Arc<Engine>>,
    Query(q): Query<CalendarQuery>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let range = month_range(q.year, q.month)
        .ok_or_else(|| ApiError::bad_request("year/month is not a valid calendar month"))?;
    let list = engine.list_bookings(&q.property_id, &range);
    Ok(Json(list.into_iter().map(Into::into).collect()))
}
