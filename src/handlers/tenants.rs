use axum::extract::Path;
use chrono::Utc;
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::entitlements::{self, ledger, usage, Dimension};
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

/// Per-dimension limit/usage report for any tenant. Super-admin only; this
/// is the one route that reads across tenant boundaries.
pub async fn usage_report(Path(tenant_id): Path<i64>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let entitlements = entitlements::load(&pool, tenant_id)
        .await?
        .ok_or(ApiError::TenantNotFound)?;

    let now = Utc::now();
    let mut report = serde_json::Map::new();
    for dimension in Dimension::ALL {
        let limite = entitlements.limits.get(dimension);
        let atual =
            usage::current(&pool, tenant_id, dimension, &entitlements.timezone, now).await?;
        report.insert(
            dimension.as_str().to_string(),
            json!({ "limite": limite, "atual": atual }),
        );
    }

    let saldo = ledger::balance(&pool, tenant_id).await?.unwrap_or(0);
    report.insert("avulsas_saldo".to_string(), json!(saldo));

    Ok(ApiResponse::success(Value::Object(report)))
}
