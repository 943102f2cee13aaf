use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::Engine;
use crate::model::{month_range, Block, DateRange};
use crate::observability;

use super::error::ApiError;

pub fn routes() -> Router<Arc<Engine>> {
    Router::new()
        .route("/", post(create))
        .route("/calendar", get(calendar))
        .route("/{id}", put(update).delete(delete_one))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub property_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    pub id: Ulid,
    pub property_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<Block> for BlockResponse {
    fn from(b: Block) -> Self {
        Self {
            id: b.id,
            property_id: b.property_id,
            start_date: b.range.start,
            end_date: b.range.end,
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
    Json(req): Json<BlockRequest>,
) -> Result<(StatusCode, Json<BlockResponse>), ApiError> {
    let started = Instant::now();
    let result = engine
        .create_block(
            req.property_id,
            DateRange {
                start: req.start_date,
                end: req.end_date,
            },
        )
        .await;
    observability::track("create_block", started, &result);
    Ok((StatusCode::CREATED, Json(result?.into())))
}

async fn update(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
    Json(req): Json<BlockRequest>,
) -> Result<Json<BlockResponse>, ApiError> {
    let started = Instant::now();
    let result = engine
        .update_block(
            id,
            req.property_id,
            DateRange {
                start: req.start_date,
                end: req.end_date,
            },
        )
        .await;
    observability::track("update_block", started, &result);
    Ok(Json(result?.into()))
}

async fn delete_one(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<Ulid>,
) -> Result<StatusCode, ApiError> {
    let started = Instant::now();
    let result = engine.delete_block(id).await;
    observability::track("delete_block", started, &result);
    result?;
    Ok(StatusCode::NO_CONTENT)
}

async fn calendar(
    State(engine): State<Arc<Engine>>,
    Query(q): Query<CalendarQuery>,
) -> Result<Json<Vec<BlockResponse>>, ApiError> {
    let range = month_range(q.year, q.month)
        .ok_or_else(|| ApiError::bad_request("year/month is not a valid calendar month"))?;
    let list = engine.list_blocks(&q.property_id, &range);
    Ok(Json(list.into_iter().map(Into::into).collect()))
}
