use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::{Arguments, PgPool};

use super::manager::DatabaseError;

/// A value bound into a tenant-scoped statement after the implicit tenant id.
#[derive(Debug, Clone)]
pub enum SqlParam {
    Int(i64),
    Text(String),
    OptText(Option<String>),
    Bool(bool),
    Json(serde_json::Value),
    TextArray(Vec<String>),
    Timestamp(DateTime<Utc>),
    OptTimestamp(Option<DateTime<Utc>>),
}

/// Query capability bound to a resolved tenant.
///
/// Every statement run through this handle receives the tenant id as `$1`, so
/// downstream handlers write `WHERE tenant_id = $1` and cannot reach another
/// tenant's rows without going around the context entirely.
#[derive(Clone)]
pub struct TenantDb {
    pool: PgPool,
    tenant_id: i64,
}

impl TenantDb {
    pub fn new(pool: PgPool, tenant_id: i64) -> Self {
        Self { pool, tenant_id }
    }

    pub fn tenant_id(&self) -> i64 {
        self.tenant_id
    }

    fn arguments(&self, params: &[SqlParam]) -> PgArguments {
        let mut args = PgArguments::default();
        args.add(self.tenant_id);
        for param in params {
            match param {
                SqlParam::Int(v) => args.add(*v),
                SqlParam::Text(v) => args.add(v.clone()),
                SqlParam::OptText(v) => args.add(v.clone()),
                SqlParam::Bool(v) => args.add(*v),
                SqlParam::Json(v) => args.add(v.clone()),
                SqlParam::TextArray(v) => args.add(v.clone()),
                SqlParam::Timestamp(v) => args.add(*v),
                SqlParam::OptTimestamp(v) => args.add(*v),
            }
        }
        args
    }

    /// Run a statement; returns the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64, DatabaseError> {
        let done = sqlx::query_with(sql, self.arguments(params))
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    /// Run an `INSERT ... RETURNING id` statement.
    pub async fn insert_returning_id(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<i64, DatabaseError> {
        let id: i64 = sqlx::query_scalar_with(sql, self.arguments(params))
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// Run a tenant-scoped count query.
    pub async fn fetch_count(&self, sql: &str) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar_with(sql, self.arguments(&[]))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
