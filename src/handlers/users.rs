use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::user::Role;
use crate::database::scoped::SqlParam;
use crate::error::ApiError;
use crate::middleware::context::RequestContext;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

fn default_role() -> String {
    "agent".to_string()
}

pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateUser>,
) -> ApiResult<Value> {
    let role = Role::parse_or_default(&payload.role);
    // Only a super admin may mint another super admin.
    if role == Role::SuperAdmin && ctx.user.role != Role::SuperAdmin {
        return Err(ApiError::Forbidden { required: None });
    }

    let id = ctx
        .db
        .insert_returning_id(
            "INSERT INTO users (tenant_id, name, email, role, permissions, active) \
             VALUES ($1, $2, $3, $4, $5, true) RETURNING id",
            &[
                SqlParam::Text(payload.name),
                SqlParam::Text(payload.email),
                SqlParam::Text(role.as_str().to_string()),
                SqlParam::TextArray(payload.permissions),
            ],
        )
        .await?;

    Ok(ApiResponse::created(json!({ "id": id })))
}
