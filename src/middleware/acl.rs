//! Role and permission checks layered after tenant resolution.

use axum::{extract::Request, middleware::Next, response::Response};

use super::context::RequestContext;
use crate::database::models::user::Role;
use crate::error::ApiError;

fn current(request: &Request) -> Result<&RequestContext, ApiError> {
    request.extensions().get::<RequestContext>().ok_or_else(|| {
        ApiError::Internal("access control invoked without tenant context".to_string())
    })
}

/// Require an explicit permission string. Admin roles bypass the check.
pub async fn check_permission(
    required: &'static str,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = &current(&request)?.user;
    if !user.role.is_admin() && !user.permissions.iter().any(|p| p == required) {
        tracing::warn!("user {} denied: missing permission '{}'", user.id, required);
        return Err(ApiError::Forbidden {
            required: Some(required.to_string()),
        });
    }
    Ok(next.run(request).await)
}

/// Require the principal's role to be in the allowed set.
pub async fn check_roles(
    allowed: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = &current(&request)?.user;
    if !allowed.contains(&user.role) {
        tracing::warn!("user {} denied: role {} not allowed", user.id, user.role.as_str());
        return Err(ApiError::Forbidden { required: None });
    }
    Ok(next.run(request).await)
}

/// Require the super-admin role, strictly.
pub async fn check_super_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = &current(&request)?.user;
    if user.role != Role::SuperAdmin {
        tracing::warn!("user {} denied: super admin required", user.id);
        return Err(ApiError::Forbidden { required: None });
    }
    Ok(next.run(request).await)
}
