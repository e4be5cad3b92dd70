//! Prepaid top-up balance (`avulsas_saldo`).
//!
//! The balance is the only shared counter the gateway mutates. The debit is
//! a single conditional statement so that concurrent requests can never
//! drive it below zero: the losing racer simply matches no row.

use sqlx::PgPool;

use crate::database::manager::DatabaseError;

/// Current top-up balance, or `None` when the tenant row is missing.
pub async fn balance(pool: &PgPool, tenant_id: i64) -> Result<Option<i64>, DatabaseError> {
    let saldo: Option<i32> = sqlx::query_scalar("SELECT avulsas_saldo FROM tenants WHERE id = $1")
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;
    Ok(saldo.map(i64::from))
}

/// Spend one credit, incrementing the cumulative used counter in lockstep.
///
/// Returns the remaining balance after the debit, or `None` when the balance
/// was already zero (no row matched the conditional update).
pub async fn debit_one(pool: &PgPool, tenant_id: i64) -> Result<Option<i64>, DatabaseError> {
    let remaining: Option<i32> = sqlx::query_scalar(
        "UPDATE tenants \
         SET avulsas_saldo = avulsas_saldo - 1, avulsas_usadas = avulsas_usadas + 1 \
         WHERE id = $1 AND avulsas_saldo > 0 \
         RETURNING avulsas_saldo",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;
    Ok(remaining.map(i64::from))
}
