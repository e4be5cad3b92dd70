use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::scoped::SqlParam;
use crate::middleware::context::RequestContext;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::quota::TopUpDebit;

#[derive(Debug, Deserialize)]
pub struct RunLookup {
    /// Document to enrich (phone number or CPF/CNPJ).
    pub document: String,
}

/// Record an enrichment lookup. When the gate funded the request from the
/// top-up balance it attaches a [`TopUpDebit`]; persisting `from_topup` here
/// is what keeps the lookup out of next month's allowance count.
pub async fn run(
    Extension(ctx): Extension<RequestContext>,
    debit: Option<Extension<TopUpDebit>>,
    Json(payload): Json<RunLookup>,
) -> ApiResult<Value> {
    let from_topup = debit.is_some();
    let id = ctx
        .db
        .insert_returning_id(
            "INSERT INTO enrichment_lookups (tenant_id, document, from_topup) \
             VALUES ($1, $2, $3) RETURNING id",
            &[
                SqlParam::Text(payload.document),
                SqlParam::Bool(from_topup),
            ],
        )
        .await?;

    let mut body = json!({ "id": id, "from_topup": from_topup });
    if let Some(Extension(debit)) = debit {
        body["avulsas_saldo"] = json!(debit.remaining);
    }

    Ok(ApiResponse::created(body))
}
