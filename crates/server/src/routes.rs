use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use aisle_core::chrono::Utc;
use aisle_core::domain::placement::{Placement, PlacementId, PlacementStatus};
use aisle_db::repositories::{
    PlacementRepository, SmsRepository, SqlPlacementRepository, SqlSmsRepository,
};
use aisle_db::DbPool;

use crate::placement::PlacementJob;

#[derive(Clone)]
pub struct ApiState {
    db_pool: DbPool,
    jobs: mpsc::Sender<PlacementJob>,
}

pub fn router(db_pool: DbPool, jobs: mpsc::Sender<PlacementJob>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/order", post(submit_order))
        .route("/submit-2fa", post(submit_sms))
        .with_state(ApiState { db_pool, jobs })
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    shopping_list: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderAccepted {
    success: bool,
    message: String,
    placement_id: String,
    items: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SmsRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
pub struct SmsAccepted {
    success: bool,
    message_id: i64,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    error: String,
}

fn bad_request(message: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::BAD_REQUEST, Json(ApiError { error: message.to_owned() }))
}

fn internal_error(message: &str) -> (StatusCode, Json<ApiError>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError { error: message.to_owned() }))
}

/// Accepts a shopping list and starts a background placement. The caller
/// only ever sees this acknowledgment; the outcome lands in the placements
/// table and the logs.
async fn submit_order(
    State(state): State<ApiState>,
    Json(body): Json<OrderRequest>,
) -> Result<(StatusCode, Json<OrderAccepted>), (StatusCode, Json<ApiError>)> {
    let items: Vec<String> = body
        .shopping_list
        .iter()
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        return Err(bad_request("Shopping list is required"));
    }

    let now = Utc::now();
    let placement = Placement {
        id: PlacementId(format!("PL-{}", &Uuid::new_v4().simple().to_string()[..12])),
        status: PlacementStatus::Queued,
        shopping_list: items.clone(),
        error: None,
        order_id: None,
        created_at: now,
        updated_at: now,
    };

    let placements = SqlPlacementRepository::new(state.db_pool.clone());
    placements.create(&placement).await.map_err(|repo_error| {
        error!(
            event_name = "order.placement_record_failed",
            error = %repo_error,
            "could not record placement"
        );
        internal_error("Internal server error")
    })?;

    let job = PlacementJob { placement_id: placement.id.clone(), shopping_list: items.clone() };
    if state.jobs.send(job).await.is_err() {
        let _ = placements.mark_failed(&placement.id, "placement worker is not running").await;
        error!(
            event_name = "order.worker_unavailable",
            placement_id = %placement.id,
            "placement worker is not running"
        );
        return Err(internal_error("Internal server error"));
    }

    info!(
        event_name = "order.accepted",
        placement_id = %placement.id,
        items = items.len(),
        "shopping list accepted for background placement"
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(OrderAccepted {
            success: true,
            message: "Order processing started".to_owned(),
            placement_id: placement.id.0.clone(),
            items,
        }),
    ))
}

async fn submit_sms(
    State(state): State<ApiState>,
    Json(body): Json<SmsRequest>,
) -> Result<Json<SmsAccepted>, (StatusCode, Json<ApiError>)> {
    if body.message.trim().is_empty() {
        return Err(bad_request("Message is required"));
    }

    let sms = SqlSmsRepository::new(state.db_pool.clone());
    let message_id = sms.store_message(&body.message).await.map_err(|repo_error| {
        error!(
            event_name = "sms.store_failed",
            error = %repo_error,
            "could not store intercepted message"
        );
        internal_error("Internal server error")
    })?;

    info!(event_name = "sms.stored", message_id, "two-factor message stored");
    Ok(Json(SmsAccepted {
        success: true,
        message_id,
        message: "2FA message stored successfully".to_owned(),
    }))
}

async fn health(
    State(state): State<ApiState>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ApiError>)> {
    sqlx::query("SELECT 1").execute(&state.db_pool).await.map_err(|_| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError { error: "database unavailable".to_owned() }),
        )
    })?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
