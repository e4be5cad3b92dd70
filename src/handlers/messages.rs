use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::scoped::SqlParam;
use crate::middleware::context::RequestContext;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub to: String,
    pub body: String,
}

/// Record an outbound message. Actual delivery is the sending worker's job;
/// the row's `sent_at` is what the daily quota window counts.
pub async fn send(
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<SendMessage>,
) -> ApiResult<Value> {
    let id = ctx
        .db
        .insert_returning_id(
            "INSERT INTO messages (tenant_id, to_number, body, sent_at) \
             VALUES ($1, $2, $3, now()) RETURNING id",
            &[SqlParam::Text(payload.to), SqlParam::Text(payload.body)],
        )
        .await?;

    Ok(ApiResponse::created(json!({ "id": id })))
}
