use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::scoped::SqlParam;
use crate::middleware::context::RequestContext;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateCampaign {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// New campaigns start `pending`, which already counts toward the
/// concurrent-campaign limit checked by the gate.
pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateCampaign>,
) -> ApiResult<Value> {
    let id = ctx
        .db
        .insert_returning_id(
            "INSERT INTO campaigns (tenant_id, name, message, status, scheduled_at) \
             VALUES ($1, $2, $3, 'pending', $4) RETURNING id",
            &[
                SqlParam::Text(payload.name),
                SqlParam::Text(payload.message),
                SqlParam::OptTimestamp(payload.scheduled_at),
            ],
        )
        .await?;

    Ok(ApiResponse::created(json!({ "id": id, "status": "pending" })))
}
