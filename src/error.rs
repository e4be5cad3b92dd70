// HTTP API error types for the gateway
use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::database::manager::DatabaseError;
use crate::entitlements::Dimension;

/// Every gate failure is converted to one of these before it leaves the
/// gateway; raw store errors never reach the caller.
#[derive(Debug)]
pub enum ApiError {
    // 401 Unauthorized
    Unauthenticated,
    InvalidCredential,
    CredentialExpired,
    /// Token verified but no matching principal row. Reported as an auth
    /// failure rather than a 404 to avoid existence leakage.
    PrincipalNotFound,

    // 403 Forbidden
    PrincipalDisabled,
    TenantDisabled,
    TenantSuspended {
        renewal: Option<DateTime<Utc>>,
    },
    TenantCancelled,
    Forbidden {
        required: Option<String>,
    },
    QuotaExceeded {
        dimension: Dimension,
        limit: i64,
        usage: i64,
        /// Remaining top-up balance, reported only on the enrichment-lookup
        /// dimension so the client can prompt a purchase flow.
        top_up: Option<i64>,
    },

    // 400 Bad Request
    TenantUnresolved,
    InvalidPayload(String),

    // 404 Not Found
    TenantNotFound,

    // 500 Internal Server Error; detail is logged, never sent to the caller
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated
            | ApiError::InvalidCredential
            | ApiError::CredentialExpired
            | ApiError::PrincipalNotFound => StatusCode::UNAUTHORIZED,
            ApiError::PrincipalDisabled
            | ApiError::TenantDisabled
            | ApiError::TenantSuspended { .. }
            | ApiError::TenantCancelled
            | ApiError::Forbidden { .. }
            | ApiError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            ApiError::TenantUnresolved | ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::TenantNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::InvalidCredential => "INVALID_CREDENTIAL",
            ApiError::CredentialExpired => "CREDENTIAL_EXPIRED",
            ApiError::PrincipalNotFound => "PRINCIPAL_NOT_FOUND",
            ApiError::PrincipalDisabled => "PRINCIPAL_DISABLED",
            ApiError::TenantDisabled => "TENANT_DISABLED",
            ApiError::TenantSuspended { .. } => "TENANT_SUSPENDED",
            ApiError::TenantCancelled => "TENANT_CANCELLED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            ApiError::TenantUnresolved => "TENANT_UNRESOLVED",
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::TenantNotFound => "TENANT_NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated => "Missing authentication token".to_string(),
            ApiError::InvalidCredential | ApiError::PrincipalNotFound => {
                "Invalid authentication token".to_string()
            }
            ApiError::CredentialExpired => {
                "Authentication token expired, please sign in again".to_string()
            }
            ApiError::PrincipalDisabled => "User account is disabled".to_string(),
            ApiError::TenantDisabled => "Company account is disabled".to_string(),
            ApiError::TenantSuspended { .. } => {
                "Subscription suspended, renew to regain access".to_string()
            }
            ApiError::TenantCancelled => "Subscription cancelled".to_string(),
            ApiError::Forbidden { required: Some(permission) } => {
                format!("Access denied: missing permission '{}'", permission)
            }
            ApiError::Forbidden { required: None } => "Access denied".to_string(),
            ApiError::QuotaExceeded {
                dimension,
                top_up: Some(0),
                ..
            } if *dimension == Dimension::Lookups => {
                "Monthly lookup allowance exhausted and no top-up credits remain".to_string()
            }
            ApiError::QuotaExceeded {
                dimension,
                limit,
                usage,
                ..
            } => format!(
                "Limit reached for {}: {} of {} in use",
                dimension.label(),
                usage,
                limit
            ),
            ApiError::TenantUnresolved => {
                "Tenant could not be determined for this request".to_string()
            }
            ApiError::InvalidPayload(msg) => msg.clone(),
            ApiError::TenantNotFound => "Tenant not found".to_string(),
            ApiError::Internal(_) => {
                "An error occurred while processing your request".to_string()
            }
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code(),
        });

        match self {
            ApiError::TenantSuspended { renewal } => {
                body["renovacao"] = json!(renewal);
            }
            ApiError::Forbidden {
                required: Some(permission),
            } => {
                body["permissao"] = json!(permission);
            }
            ApiError::QuotaExceeded {
                dimension,
                limit,
                usage,
                top_up,
            } => {
                body["tipo"] = json!(dimension.as_str());
                body["limite"] = json!(limit);
                body["atual"] = json!(usage);
                if let Some(saldo) = top_up {
                    body["avulsas_saldo"] = json!(saldo);
                }
            }
            _ => {}
        }

        body
    }
}

// Store errors fail closed as internal errors; full detail stays in the logs.
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(format!("database error: {}", err))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("internal error: {}", detail);
        }
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::CredentialExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::PrincipalNotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TenantCancelled.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::TenantUnresolved.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TenantNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::QuotaExceeded {
                dimension: Dimension::Users,
                limit: 5,
                usage: 5,
                top_up: None,
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn quota_payload_reports_limit_and_usage() {
        let body = ApiError::QuotaExceeded {
            dimension: Dimension::Users,
            limit: 5,
            usage: 5,
            top_up: None,
        }
        .to_json();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["tipo"], json!("usuarios"));
        assert_eq!(body["limite"], json!(5));
        assert_eq!(body["atual"], json!(5));
        assert!(body.get("avulsas_saldo").is_none());
    }

    #[test]
    fn exhausted_lookup_payload_reports_empty_balance() {
        let body = ApiError::QuotaExceeded {
            dimension: Dimension::Lookups,
            limit: 100,
            usage: 100,
            top_up: Some(0),
        }
        .to_json();
        assert_eq!(body["tipo"], json!("consultas"));
        assert_eq!(body["avulsas_saldo"], json!(0));
    }

    #[test]
    fn forbidden_payload_names_missing_permission() {
        let body = ApiError::Forbidden {
            required: Some("contacts:import".to_string()),
        }
        .to_json();
        assert_eq!(body["permissao"], json!("contacts:import"));
    }

    #[test]
    fn internal_detail_never_reaches_the_body() {
        let body = ApiError::Internal("connection refused at 10.0.0.5".to_string()).to_json();
        let rendered = body.to_string();
        assert!(!rendered.contains("10.0.0.5"));
    }

    #[test]
    fn principal_not_found_is_indistinguishable_from_bad_token() {
        assert_eq!(
            ApiError::PrincipalNotFound.message(),
            ApiError::InvalidCredential.message()
        );
    }
}
