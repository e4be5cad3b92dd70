use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::context::RequestContext;
use crate::middleware::response::{ApiResponse, ApiResult};

/// Echo the resolved context so clients can render account state without a
/// second round-trip.
pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user": ctx.user,
        "tenant": ctx.tenant,
    })))
}
