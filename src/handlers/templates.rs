use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::scoped::SqlParam;
use crate::middleware::context::RequestContext;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub body: String,
}

pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateTemplate>,
) -> ApiResult<Value> {
    let id = ctx
        .db
        .insert_returning_id(
            "INSERT INTO templates (tenant_id, name, body) VALUES ($1, $2, $3) RETURNING id",
            &[SqlParam::Text(payload.name), SqlParam::Text(payload.body)],
        )
        .await?;

    Ok(ApiResponse::created(json!({ "id": id })))
}
