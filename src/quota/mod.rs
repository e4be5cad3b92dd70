//! Per-resource quota gates.
//!
//! Each protected route carries the middleware for its dimension; all of
//! them share [`gate`]. Checks are read-then-act and deliberately advisory
//! under concurrency (two racing requests may both pass, overshooting a soft
//! limit by a bounded amount). The one hard invariant, the top-up balance,
//! is protected by the ledger's conditional decrement instead.

use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Path, Request},
    http::Extensions,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde_json::Value;

use crate::database::manager::DatabaseManager;
use crate::database::models::user::Role;
use crate::entitlements::{self, ledger, usage, Dimension, TenantEntitlements, UNLIMITED};
use crate::error::ApiError;
use crate::middleware::context::RequestContext;

/// Attached to the request when the gate allowed an enrichment lookup by
/// drawing down the prepaid balance; the handler persists this.
#[derive(Clone, Copy, Debug)]
pub struct TopUpDebit {
    pub remaining: i64,
}

/// Path parameters, present only on routes that carry them.
type PathParams = Option<Path<HashMap<String, String>>>;

const MAX_BUFFERED_BODY: usize = 2 * 1024 * 1024;

pub async fn check_user_limit(
    params: PathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate(Dimension::Users, 0, &params, request.extensions()).await?;
    Ok(next.run(request).await)
}

pub async fn check_whatsapp_limit(
    params: PathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate(Dimension::WhatsappAccounts, 0, &params, request.extensions()).await?;
    Ok(next.run(request).await)
}

pub async fn check_campaign_limit(
    params: PathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate(Dimension::Campaigns, 0, &params, request.extensions()).await?;
    Ok(next.run(request).await)
}

pub async fn check_daily_message_limit(
    params: PathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate(Dimension::DailyMessages, 0, &params, request.extensions()).await?;
    Ok(next.run(request).await)
}

pub async fn check_template_limit(
    params: PathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate(Dimension::Templates, 0, &params, request.extensions()).await?;
    Ok(next.run(request).await)
}

/// Contacts are the one dimension checked against a prospective total: the
/// request is rejected pre-emptively when the post-import count would exceed
/// the limit. The body is buffered to read the batch size, then restored.
pub async fn check_contact_limit(
    params: PathParams,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BUFFERED_BODY)
        .await
        .map_err(|e| ApiError::InvalidPayload(format!("failed to read request body: {}", e)))?;
    let additional = requested_contacts(&bytes);
    let request = Request::from_parts(parts, Body::from(bytes));

    gate(Dimension::Contacts, additional, &params, request.extensions()).await?;
    Ok(next.run(request).await)
}

/// Monthly enrichment lookups, with the top-up overflow path.
pub async fn check_lookup_limit(
    params: PathParams,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(debit) = gate(Dimension::Lookups, 0, &params, request.extensions()).await? {
        request.extensions_mut().insert(debit);
    }
    Ok(next.run(request).await)
}

/// Shared check. Returns `Some(TopUpDebit)` when the request was allowed by
/// spending a top-up credit, `None` on a plain allow, and an error otherwise.
async fn gate(
    dimension: Dimension,
    additional: i64,
    params: &PathParams,
    extensions: &Extensions,
) -> Result<Option<TopUpDebit>, ApiError> {
    let context = extensions.get::<RequestContext>();

    // Super admins are exempt from every dimension, before any lookup.
    if let Some(ctx) = context {
        if ctx.user.role == Role::SuperAdmin {
            return Ok(None);
        }
    }

    // Tenant resolution order: authenticated context, then the route path
    // parameter. The parameter is a compatibility shim for routes wired
    // ahead of context attachment.
    let (tenant_id, entitlements) = match context {
        Some(ctx) => (
            ctx.tenant.id,
            TenantEntitlements {
                limits: ctx.tenant.limits.clone(),
                timezone: ctx.tenant.timezone.clone(),
            },
        ),
        None => {
            let tenant_id = path_tenant_id(params).ok_or(ApiError::TenantUnresolved)?;
            let pool = DatabaseManager::pool().await?;
            let entitlements = entitlements::load(&pool, tenant_id)
                .await?
                .ok_or(ApiError::TenantNotFound)?;
            (tenant_id, entitlements)
        }
    };

    let limit = entitlements.limits.get(dimension);
    if limit == UNLIMITED {
        return Ok(None);
    }
    if dimension == Dimension::Lookups && limit <= 0 {
        // A monthly allowance of zero or below (other than the -1 sentinel)
        // is not enforced. Matches the billing rules as shipped.
        return Ok(None);
    }

    let pool = DatabaseManager::pool().await?;
    let current = usage::current(&pool, tenant_id, dimension, &entitlements.timezone, Utc::now())
        .await?;

    match verdict(dimension, limit, current, additional) {
        Verdict::Allow => Ok(None),
        Verdict::Overflow => match ledger::debit_one(&pool, tenant_id).await? {
            Some(remaining) => {
                tracing::debug!(
                    "tenant {} lookup funded from top-up balance, {} remaining",
                    tenant_id,
                    remaining
                );
                Ok(Some(TopUpDebit { remaining }))
            }
            None => Err(ApiError::QuotaExceeded {
                dimension,
                limit,
                usage: current,
                top_up: Some(0),
            }),
        },
        Verdict::Reject => Err(ApiError::QuotaExceeded {
            dimension,
            limit,
            usage: current,
            top_up: None,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Allow,
    Reject,
    /// Allowance exhausted; eligible to draw down the top-up balance.
    Overflow,
}

fn verdict(dimension: Dimension, limit: i64, usage: i64, additional: i64) -> Verdict {
    if limit == UNLIMITED {
        return Verdict::Allow;
    }
    match dimension {
        Dimension::Contacts => {
            if usage + additional > limit {
                Verdict::Reject
            } else {
                Verdict::Allow
            }
        }
        Dimension::Lookups => {
            if limit <= 0 || usage < limit {
                Verdict::Allow
            } else {
                Verdict::Overflow
            }
        }
        _ => {
            if usage >= limit {
                Verdict::Reject
            } else {
                Verdict::Allow
            }
        }
    }
}

fn path_tenant_id(params: &PathParams) -> Option<i64> {
    let map = &params.as_ref()?.0;
    map.get("tenant_id")
        .or_else(|| map.get("id"))?
        .parse()
        .ok()
}

/// Number of contacts the request intends to add. The batch is read from
/// `contacts`, falling back to the legacy `contatos` field.
fn requested_contacts(body: &Bytes) -> i64 {
    let Ok(json) = serde_json::from_slice::<Value>(body) else {
        return 0;
    };
    ["contacts", "contatos"]
        .iter()
        .find_map(|key| json.get(key).and_then(Value::as_array))
        .map(|batch| batch.len() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_at_limit_rejects_one_below_allows() {
        assert_eq!(verdict(Dimension::Users, 5, 5, 0), Verdict::Reject);
        assert_eq!(verdict(Dimension::Users, 5, 4, 0), Verdict::Allow);
        assert_eq!(verdict(Dimension::Users, 5, 6, 0), Verdict::Reject);
    }

    #[test]
    fn unlimited_sentinel_always_allows() {
        for dimension in Dimension::ALL {
            assert_eq!(verdict(dimension, UNLIMITED, 1_000_000, 500), Verdict::Allow);
        }
    }

    #[test]
    fn zero_limit_rejects_soft_dimensions() {
        assert_eq!(verdict(Dimension::Users, 0, 0, 0), Verdict::Reject);
    }

    #[test]
    fn contacts_compare_the_prospective_total() {
        // 90 existing + 10 incoming fits a limit of 100; 11 does not.
        assert_eq!(verdict(Dimension::Contacts, 100, 90, 10), Verdict::Allow);
        assert_eq!(verdict(Dimension::Contacts, 100, 90, 11), Verdict::Reject);
        // At the limit with nothing to add is still fine for contacts.
        assert_eq!(verdict(Dimension::Contacts, 100, 100, 0), Verdict::Allow);
    }

    #[test]
    fn exhausted_lookups_overflow_instead_of_rejecting() {
        assert_eq!(verdict(Dimension::Lookups, 100, 99, 0), Verdict::Allow);
        assert_eq!(verdict(Dimension::Lookups, 100, 100, 0), Verdict::Overflow);
        assert_eq!(verdict(Dimension::Lookups, 100, 150, 0), Verdict::Overflow);
    }

    #[test]
    fn non_positive_lookup_allowance_is_not_enforced() {
        // Zero or negative (non-sentinel) monthly allowances skip
        // enforcement entirely; preserved as shipped.
        assert_eq!(verdict(Dimension::Lookups, 0, 500, 0), Verdict::Allow);
        assert_eq!(verdict(Dimension::Lookups, -5, 500, 0), Verdict::Allow);
    }

    #[test]
    fn contact_batch_read_from_either_field_name() {
        let body = Bytes::from(r#"{"contacts": [{"name": "a"}, {"name": "b"}]}"#);
        assert_eq!(requested_contacts(&body), 2);

        let body = Bytes::from(r#"{"contatos": [{"name": "a"}]}"#);
        assert_eq!(requested_contacts(&body), 1);

        // `contacts` wins when both are present
        let body = Bytes::from(r#"{"contacts": [1, 2, 3], "contatos": [1]}"#);
        assert_eq!(requested_contacts(&body), 3);
    }

    #[test]
    fn fallback_tenant_id_prefers_tenant_param_over_id() {
        let params: PathParams = Some(Path(HashMap::from([
            ("tenant_id".to_string(), "7".to_string()),
            ("id".to_string(), "9".to_string()),
        ])));
        assert_eq!(path_tenant_id(&params), Some(7));

        let params: PathParams = Some(Path(HashMap::from([(
            "id".to_string(),
            "9".to_string(),
        )])));
        assert_eq!(path_tenant_id(&params), Some(9));

        assert_eq!(path_tenant_id(&None), None);
    }

    #[test]
    fn malformed_or_empty_body_counts_zero() {
        assert_eq!(requested_contacts(&Bytes::new()), 0);
        assert_eq!(requested_contacts(&Bytes::from("not json")), 0);
        assert_eq!(requested_contacts(&Bytes::from(r#"{"contacts": "nope"}"#)), 0);
    }
}
