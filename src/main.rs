use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use zapflow_api::database::manager::DatabaseManager;
use zapflow_api::database::models::user::Role;
use zapflow_api::handlers::{
    auth as auth_handlers, campaigns, contacts, lookups, messages, templates, tenants, users,
    whatsapp,
};
use zapflow_api::middleware::{acl, context};
use zapflow_api::quota;

const ADMIN_ROLES: &[Role] = &[Role::SuperAdmin, Role::TenantAdmin];

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = zapflow_api::config::config();
    tracing_subscriber::fmt::init();
    tracing::info!("Starting ZapFlow API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("ZAPFLOW_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    let mut app = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Everything under /api goes through the tenant context resolver
        .merge(protected_routes());

    if zapflow_api::config::config().security.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }
    app.layer(TraceLayer::new_for_http())
}

fn protected_routes() -> Router {
    let users_routes = Router::new()
        .route("/api/users", post(users::create))
        .route_layer(from_fn(quota::check_user_limit))
        .route_layer(from_fn(|r: Request, n: Next| {
            acl::check_roles(ADMIN_ROLES, r, n)
        }));

    let whatsapp_routes = Router::new()
        .route("/api/whatsapp/accounts", post(whatsapp::create_account))
        .route("/api/whatsapp/instances", post(whatsapp::create_instance))
        .route_layer(from_fn(quota::check_whatsapp_limit))
        .route_layer(from_fn(|r: Request, n: Next| {
            acl::check_permission("whatsapp:manage", r, n)
        }));

    let campaign_routes = Router::new()
        .route("/api/campaigns", post(campaigns::create))
        .route_layer(from_fn(quota::check_campaign_limit))
        .route_layer(from_fn(|r: Request, n: Next| {
            acl::check_permission("campaigns:manage", r, n)
        }));

    let message_routes = Router::new()
        .route("/api/messages", post(messages::send))
        .route_layer(from_fn(quota::check_daily_message_limit));

    let template_routes = Router::new()
        .route("/api/templates", post(templates::create))
        .route_layer(from_fn(quota::check_template_limit));

    let contact_routes = Router::new()
        .route("/api/contacts/import", post(contacts::import))
        .route_layer(from_fn(quota::check_contact_limit))
        .route_layer(from_fn(|r: Request, n: Next| {
            acl::check_permission("contacts:import", r, n)
        }));

    let lookup_routes = Router::new()
        .route("/api/lookups", post(lookups::run))
        .route_layer(from_fn(quota::check_lookup_limit));

    let admin_routes = Router::new()
        .route("/api/tenants/:id/usage", get(tenants::usage_report))
        .route_layer(from_fn(acl::check_super_admin));

    Router::new()
        .route("/api/auth/me", get(auth_handlers::whoami))
        .merge(users_routes)
        .merge(whatsapp_routes)
        .merge(campaign_routes)
        .merge(message_routes)
        .merge(template_routes)
        .merge(contact_routes)
        .merge(lookup_routes)
        .merge(admin_routes)
        .layer(from_fn(context::tenant_context_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "ZapFlow API",
            "version": version,
            "description": "Multi-tenant WhatsApp campaign platform gateway",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/auth/me (protected)",
                "users": "/api/users (protected)",
                "whatsapp": "/api/whatsapp/accounts, /api/whatsapp/instances (protected)",
                "campaigns": "/api/campaigns (protected)",
                "messages": "/api/messages (protected)",
                "templates": "/api/templates (protected)",
                "contacts": "/api/contacts/import (protected)",
                "lookups": "/api/lookups (protected)",
                "admin": "/api/tenants/:id/usage (super admin)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
