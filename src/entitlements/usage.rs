//! Live usage aggregation per quota dimension.
//!
//! Usage is never cached: every check recomputes the count from current
//! state. A dimension's usage is the sum of one or more source sub-queries,
//! so capabilities served by parallel subsystems (official API accounts and
//! QR-paired instances, for example) share a single limit and new subsystems
//! only need a new entry in the source list.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{period, Dimension};
use crate::database::manager::DatabaseError;

const USER_SOURCES: &[&str] =
    &["SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND active = true"];

const WHATSAPP_SOURCES: &[&str] = &[
    "SELECT COUNT(*) FROM whatsapp_accounts WHERE tenant_id = $1",
    "SELECT COUNT(*) FROM whatsapp_instances WHERE tenant_id = $1",
];

const CAMPAIGN_SOURCES: &[&str] = &[
    "SELECT COUNT(*) FROM campaigns WHERE tenant_id = $1 AND status IN ('running', 'scheduled', 'pending')",
    "SELECT COUNT(*) FROM api_campaigns WHERE tenant_id = $1 AND status IN ('running', 'scheduled', 'pending')",
];

const MESSAGE_SOURCES: &[&str] = &[
    "SELECT COUNT(*) FROM messages WHERE tenant_id = $1 AND sent_at >= $2 AND sent_at < $3",
    "SELECT COUNT(*) FROM api_messages WHERE tenant_id = $1 AND sent_at >= $2 AND sent_at < $3",
];

const TEMPLATE_SOURCES: &[&str] = &[
    "SELECT COUNT(*) FROM templates WHERE tenant_id = $1",
    "SELECT COUNT(*) FROM api_templates WHERE tenant_id = $1",
];

const CONTACT_SOURCES: &[&str] = &["SELECT COUNT(*) FROM contacts WHERE tenant_id = $1"];

// Lookups funded from the top-up balance do not count against the monthly
// allowance.
const LOOKUP_SOURCES: &[&str] = &[
    "SELECT COUNT(*) FROM enrichment_lookups WHERE tenant_id = $1 AND from_topup = false AND created_at >= $2",
];

/// Current usage for one dimension, computed in a single aggregate query
/// scoped to the tenant.
pub async fn current(
    pool: &PgPool,
    tenant_id: i64,
    dimension: Dimension,
    timezone: &str,
    now: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let tz = period::tenant_tz(timezone);
    match dimension {
        Dimension::Users => plain(pool, tenant_id, USER_SOURCES).await,
        Dimension::WhatsappAccounts => plain(pool, tenant_id, WHATSAPP_SOURCES).await,
        Dimension::Campaigns => plain(pool, tenant_id, CAMPAIGN_SOURCES).await,
        Dimension::Templates => plain(pool, tenant_id, TEMPLATE_SOURCES).await,
        Dimension::Contacts => plain(pool, tenant_id, CONTACT_SOURCES).await,
        Dimension::DailyMessages => {
            let (from, to) = period::day_bounds(tz, now);
            windowed(pool, tenant_id, MESSAGE_SOURCES, from, Some(to)).await
        }
        Dimension::Lookups => {
            let from = period::month_start(tz, now);
            windowed(pool, tenant_id, LOOKUP_SOURCES, from, None).await
        }
    }
}

/// `SELECT (source1) + (source2) + ...`
fn summed_sql(sources: &[&str]) -> String {
    let parts: Vec<String> = sources.iter().map(|s| format!("({})", s)).collect();
    format!("SELECT {}", parts.join(" + "))
}

async fn plain(pool: &PgPool, tenant_id: i64, sources: &[&str]) -> Result<i64, DatabaseError> {
    let sql = summed_sql(sources);
    let total: i64 = sqlx::query_scalar(&sql)
        .bind(tenant_id)
        .fetch_one(pool)
        .await?;
    Ok(total)
}

async fn windowed(
    pool: &PgPool,
    tenant_id: i64,
    sources: &[&str],
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
) -> Result<i64, DatabaseError> {
    let sql = summed_sql(sources);
    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(tenant_id).bind(from);
    if let Some(to) = to {
        query = query.bind(to);
    }
    Ok(query.fetch_one(pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_source_stays_one_statement() {
        assert_eq!(
            summed_sql(CONTACT_SOURCES),
            "SELECT (SELECT COUNT(*) FROM contacts WHERE tenant_id = $1)"
        );
    }

    #[test]
    fn parallel_subsystems_sum_into_one_figure() {
        let sql = summed_sql(WHATSAPP_SOURCES);
        assert!(sql.starts_with("SELECT ("));
        assert!(sql.contains("whatsapp_accounts"));
        assert!(sql.contains("whatsapp_instances"));
        assert!(sql.contains(") + ("));
    }
}
