use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::scoped::SqlParam;
use crate::middleware::context::RequestContext;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ImportContacts {
    // Older clients still send `contatos`.
    #[serde(default, alias = "contatos")]
    pub contacts: Vec<ContactIn>,
}

#[derive(Debug, Deserialize)]
pub struct ContactIn {
    pub name: String,
    pub number: String,
}

/// Bulk import. The quota gate already vetted the prospective total against
/// the contact limit before the body reached this handler.
pub async fn import(
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<ImportContacts>,
) -> ApiResult<Value> {
    let mut imported = 0u64;
    for contact in payload.contacts {
        imported += ctx
            .db
            .execute(
                "INSERT INTO contacts (tenant_id, name, number) VALUES ($1, $2, $3) \
                 ON CONFLICT (tenant_id, number) DO NOTHING",
                &[SqlParam::Text(contact.name), SqlParam::Text(contact.number)],
            )
            .await?;
    }

    Ok(ApiResponse::success(json!({ "imported": imported })))
}
