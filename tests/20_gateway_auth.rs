//! Authentication rejection paths of the tenant context resolver. These run
//! entirely before any database access, so they hold with or without a
//! reachable store.

mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use zapflow_api::auth::{sign_with_secret, Claims};

fn token_with_exp(offset_secs: i64) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: 1,
        iat: (now - Duration::hours(1)).timestamp(),
        exp: (now + Duration::seconds(offset_secs)).timestamp(),
    };
    sign_with_secret(&claims, common::JWT_SECRET).expect("sign test token")
}

#[tokio::test]
async fn missing_token_is_unauthenticated() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/auth/me", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], serde_json::json!(false));
    assert_eq!(body["code"], serde_json::json!("UNAUTHENTICATED"));
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_invalid_credential() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/auth/me", server.base_url))
        .header("Authorization", "Bearer not-a-real-token")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], serde_json::json!("INVALID_CREDENTIAL"));
    Ok(())
}

#[tokio::test]
async fn non_bearer_scheme_is_invalid_credential() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/auth/me", server.base_url))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], serde_json::json!("INVALID_CREDENTIAL"));
    Ok(())
}

#[tokio::test]
async fn expired_token_is_reported_distinctly() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Valid shape and signature, but past its expiry
    let token = token_with_exp(-10);
    let res = client
        .get(format!("{}/api/auth/me", server.base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], serde_json::json!("CREDENTIAL_EXPIRED"));
    Ok(())
}
