use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth;
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::tenant::{LimitOverrides, TenantStatus};
use crate::database::models::user::Role;
use crate::database::scoped::TenantDb;
use crate::entitlements::EffectiveLimits;
use crate::error::ApiError;

/// Advisory header attached when a trial is about to end.
pub static TRIAL_DAYS_HEADER: HeaderName = HeaderName::from_static("x-trial-days-left");

/// Sanitized principal fields exposed to handlers.
#[derive(Clone, Debug, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
}

/// Sanitized tenant fields exposed to handlers.
#[derive(Clone, Debug, Serialize)]
pub struct CurrentTenant {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub slug: String,
    pub plan: Option<String>,
    pub status: TenantStatus,
    pub limits: EffectiveLimits,
    pub timezone: String,
    pub settings: serde_json::Value,
    pub integrations: serde_json::Value,
    pub renewal_at: Option<DateTime<Utc>>,
}

/// Immutable request-scoped context produced by the resolver.
#[derive(Clone)]
pub struct RequestContext {
    pub user: CurrentUser,
    pub tenant: CurrentTenant,
    pub db: TenantDb,
}

/// Resolves the tenant context for every protected route, failing closed.
///
/// Verifies the bearer token, loads the principal joined with its tenant and
/// plan, validates account and subscription status, and injects a
/// [`RequestContext`] into the request. Login statistics are updated
/// fire-and-forget and never affect the response.
pub async fn tenant_context_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let claims = auth::verify(&token)?;

    let pool = DatabaseManager::pool().await?;
    let row = load_principal(&pool, claims.sub)
        .await?
        .ok_or(ApiError::PrincipalNotFound)?;

    if !row.user_active {
        tracing::warn!("rejected disabled user {}", row.user_id);
        return Err(ApiError::PrincipalDisabled);
    }
    if !row.tenant_active {
        tracing::warn!("rejected user {} of disabled tenant {}", row.user_id, row.tenant_id);
        return Err(ApiError::TenantDisabled);
    }

    let status: TenantStatus = row.tenant_status.parse().map_err(|e: String| {
        ApiError::Internal(format!("tenant {}: {}", row.tenant_id, e))
    })?;

    let mut trial_days = None;
    match status {
        TenantStatus::Suspended => {
            return Err(ApiError::TenantSuspended {
                renewal: row.tenant_renewal_at,
            })
        }
        TenantStatus::Cancelled => return Err(ApiError::TenantCancelled),
        TenantStatus::Trial => {
            if let Some(days) = trial_days_left(row.tenant_renewal_at, Utc::now()) {
                if days <= config::config().security.trial_notice_days {
                    trial_days = Some(days);
                }
            }
        }
        TenantStatus::Active => {}
    }

    let context = build_context(&pool, row, status);

    // Best-effort login statistics; losing these under load is acceptable.
    let ip = client_ip(request.headers());
    tokio::spawn(touch_access_stats(
        pool,
        context.user.id,
        context.tenant.id,
        ip,
    ));

    tracing::debug!(
        "resolved context: user {} in tenant {} ({})",
        context.user.id,
        context.tenant.id,
        context.tenant.slug
    );
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Some(days) = trial_days {
        response
            .headers_mut()
            .insert(TRIAL_DAYS_HEADER.clone(), HeaderValue::from(days));
    }
    Ok(response)
}

/// Extract the bearer token. A missing header means "no credential at all";
/// anything present but malformed is an invalid credential.
fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::Unauthenticated)?;
    let value = header.to_str().map_err(|_| ApiError::InvalidCredential)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(ApiError::InvalidCredential)?
        .trim();
    if token.is_empty() {
        return Err(ApiError::InvalidCredential);
    }
    Ok(token.to_string())
}

/// Days until renewal, rounded up. `None` once the renewal instant passed;
/// tenants that linger past expiry are transitioned by the billing job, not
/// by this gateway.
pub fn trial_days_left(renewal: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    let renewal = renewal?;
    let secs = (renewal - now).num_seconds();
    if secs <= 0 {
        return None;
    }
    Some((secs + 86_399) / 86_400)
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = forwarded.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

#[derive(Debug, FromRow)]
struct PrincipalRow {
    user_id: i64,
    user_name: String,
    user_email: String,
    user_role: String,
    user_permissions: Vec<String>,
    user_active: bool,
    tenant_id: i64,
    tenant_uuid: Uuid,
    tenant_name: String,
    tenant_slug: String,
    tenant_status: String,
    tenant_active: bool,
    tenant_timezone: Option<String>,
    tenant_settings: Option<serde_json::Value>,
    tenant_integrations: Option<serde_json::Value>,
    tenant_renewal_at: Option<DateTime<Utc>>,
    plan_name: Option<String>,
    limite_usuarios: Option<i32>,
    limite_whatsapps: Option<i32>,
    limite_campanhas: Option<i32>,
    limite_mensagens_dia: Option<i32>,
    limite_templates: Option<i32>,
    limite_contatos: Option<i32>,
    limite_consultas_mes: Option<i32>,
    plan_limite_usuarios: Option<i32>,
    plan_limite_whatsapps: Option<i32>,
    plan_limite_campanhas: Option<i32>,
    plan_limite_mensagens_dia: Option<i32>,
    plan_limite_templates: Option<i32>,
    plan_limite_contatos: Option<i32>,
    plan_limite_consultas_mes: Option<i32>,
}

async fn load_principal(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<PrincipalRow>, ApiError> {
    let query = r#"
        SELECT
            u.id                    AS user_id,
            u.name                  AS user_name,
            u.email                 AS user_email,
            u.role                  AS user_role,
            u.permissions           AS user_permissions,
            u.active                AS user_active,
            t.id                    AS tenant_id,
            t.uuid                  AS tenant_uuid,
            t.name                  AS tenant_name,
            t.slug                  AS tenant_slug,
            t.status                AS tenant_status,
            t.active                AS tenant_active,
            t.timezone              AS tenant_timezone,
            t.settings              AS tenant_settings,
            t.integrations          AS tenant_integrations,
            t.renewal_at            AS tenant_renewal_at,
            p.name                  AS plan_name,
            t.limite_usuarios,
            t.limite_whatsapps,
            t.limite_campanhas,
            t.limite_mensagens_dia,
            t.limite_templates,
            t.limite_contatos,
            t.limite_consultas_mes,
            p.limite_usuarios       AS plan_limite_usuarios,
            p.limite_whatsapps      AS plan_limite_whatsapps,
            p.limite_campanhas      AS plan_limite_campanhas,
            p.limite_mensagens_dia  AS plan_limite_mensagens_dia,
            p.limite_templates      AS plan_limite_templates,
            p.limite_contatos       AS plan_limite_contatos,
            p.limite_consultas_mes  AS plan_limite_consultas_mes
        FROM users u
        JOIN tenants t ON t.id = u.tenant_id
        LEFT JOIN plans p ON p.id = t.plan_id
        WHERE u.id = $1
    "#;

    let row = sqlx::query_as::<_, PrincipalRow>(query)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to load principal: {}", e)))?;
    Ok(row)
}

fn build_context(pool: &PgPool, row: PrincipalRow, status: TenantStatus) -> RequestContext {
    let tenant_overrides = LimitOverrides {
        usuarios: row.limite_usuarios,
        whatsapps: row.limite_whatsapps,
        campanhas: row.limite_campanhas,
        mensagens_dia: row.limite_mensagens_dia,
        templates: row.limite_templates,
        contatos: row.limite_contatos,
        consultas_mes: row.limite_consultas_mes,
    };
    let plan_defaults = LimitOverrides {
        usuarios: row.plan_limite_usuarios,
        whatsapps: row.plan_limite_whatsapps,
        campanhas: row.plan_limite_campanhas,
        mensagens_dia: row.plan_limite_mensagens_dia,
        templates: row.plan_limite_templates,
        contatos: row.plan_limite_contatos,
        consultas_mes: row.plan_limite_consultas_mes,
    };

    RequestContext {
        user: CurrentUser {
            id: row.user_id,
            name: row.user_name,
            email: row.user_email,
            role: Role::parse_or_default(&row.user_role),
            permissions: row.user_permissions,
        },
        tenant: CurrentTenant {
            id: row.tenant_id,
            uuid: row.tenant_uuid,
            name: row.tenant_name,
            slug: row.tenant_slug,
            plan: row.plan_name,
            status,
            limits: EffectiveLimits::resolve(&tenant_overrides, &plan_defaults),
            timezone: row.tenant_timezone.unwrap_or_else(|| "UTC".to_string()),
            settings: row.tenant_settings.unwrap_or(serde_json::Value::Null),
            integrations: row.tenant_integrations.unwrap_or(serde_json::Value::Null),
            renewal_at: row.tenant_renewal_at,
        },
        db: TenantDb::new(pool.clone(), row.tenant_id),
    }
}

async fn touch_access_stats(pool: PgPool, user_id: i64, tenant_id: i64, ip: Option<String>) {
    let result = sqlx::query(
        "UPDATE users \
         SET last_login_at = now(), last_login_ip = $2, login_count = login_count + 1 \
         WHERE id = $1",
    )
    .bind(user_id)
    .bind(&ip)
    .execute(&pool)
    .await;
    if let Err(e) = result {
        tracing::warn!("failed to record login stats for user {}: {}", user_id, e);
    }

    let result = sqlx::query("UPDATE tenants SET last_access_at = now() WHERE id = $1")
        .bind(tenant_id)
        .execute(&pool)
        .await;
    if let Err(e) = result {
        tracing::warn!("failed to record last access for tenant {}: {}", tenant_id, e);
    }
}
