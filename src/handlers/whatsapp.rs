//! The two WhatsApp channel subsystems: accounts issued through the official
//! API and instances paired by QR code. Both draw on the same quota.

use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::scoped::SqlParam;
use crate::middleware::context::RequestContext;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateAccount {
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
}

pub async fn create_account(
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateAccount>,
) -> ApiResult<Value> {
    let id = ctx
        .db
        .insert_returning_id(
            "INSERT INTO whatsapp_accounts (tenant_id, name, provider) \
             VALUES ($1, $2, $3) RETURNING id",
            &[
                SqlParam::Text(payload.name),
                SqlParam::OptText(payload.provider),
            ],
        )
        .await?;

    Ok(ApiResponse::created(json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
pub struct CreateInstance {
    pub name: String,
}

pub async fn create_instance(
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateInstance>,
) -> ApiResult<Value> {
    let id = ctx
        .db
        .insert_returning_id(
            "INSERT INTO whatsapp_instances (tenant_id, name, status) \
             VALUES ($1, $2, 'disconnected') RETURNING id",
            &[SqlParam::Text(payload.name)],
        )
        .await?;

    Ok(ApiResponse::created(json!({ "id": id })))
}
