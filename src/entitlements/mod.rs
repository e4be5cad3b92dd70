pub mod ledger;
pub mod period;
pub mod usage;

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::models::tenant::LimitOverrides;

/// The unlimited sentinel: a limit of `-1` always allows.
pub const UNLIMITED: i64 = -1;

/// Quota-bounded resource dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Users,
    WhatsappAccounts,
    Campaigns,
    DailyMessages,
    Templates,
    Contacts,
    Lookups,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Users,
        Dimension::WhatsappAccounts,
        Dimension::Campaigns,
        Dimension::DailyMessages,
        Dimension::Templates,
        Dimension::Contacts,
        Dimension::Lookups,
    ];

    /// Wire name used in rejection payloads (`tipo`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Users => "usuarios",
            Dimension::WhatsappAccounts => "whatsapps",
            Dimension::Campaigns => "campanhas",
            Dimension::DailyMessages => "mensagens_dia",
            Dimension::Templates => "templates",
            Dimension::Contacts => "contatos",
            Dimension::Lookups => "consultas",
        }
    }

    /// Human-readable label for rejection messages.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Users => "users",
            Dimension::WhatsappAccounts => "WhatsApp accounts",
            Dimension::Campaigns => "concurrent campaigns",
            Dimension::DailyMessages => "messages today",
            Dimension::Templates => "templates",
            Dimension::Contacts => "contacts",
            Dimension::Lookups => "enrichment lookups this month",
        }
    }
}

/// Fallback limits applied when both the tenant override and the plan
/// default are missing (e.g. the plan row was deleted).
mod defaults {
    pub const USERS: i64 = 3;
    pub const WHATSAPPS: i64 = 1;
    pub const CAMPAIGNS: i64 = 2;
    pub const DAILY_MESSAGES: i64 = 500;
    pub const TEMPLATES: i64 = 20;
    pub const CONTACTS: i64 = 10_000;
    pub const LOOKUPS: i64 = 50;
}

/// Per-dimension limits after precedence resolution:
/// tenant override (non-null, `-1` = unlimited) > plan default > fallback.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveLimits {
    pub usuarios: i64,
    pub whatsapps: i64,
    pub campanhas: i64,
    pub mensagens_dia: i64,
    pub templates: i64,
    pub contatos: i64,
    pub consultas_mes: i64,
}

impl EffectiveLimits {
    pub fn resolve(tenant: &LimitOverrides, plan: &LimitOverrides) -> Self {
        Self {
            usuarios: pick(tenant.usuarios, plan.usuarios, defaults::USERS),
            whatsapps: pick(tenant.whatsapps, plan.whatsapps, defaults::WHATSAPPS),
            campanhas: pick(tenant.campanhas, plan.campanhas, defaults::CAMPAIGNS),
            mensagens_dia: pick(
                tenant.mensagens_dia,
                plan.mensagens_dia,
                defaults::DAILY_MESSAGES,
            ),
            templates: pick(tenant.templates, plan.templates, defaults::TEMPLATES),
            contatos: pick(tenant.contatos, plan.contatos, defaults::CONTACTS),
            consultas_mes: pick(tenant.consultas_mes, plan.consultas_mes, defaults::LOOKUPS),
        }
    }

    pub fn get(&self, dimension: Dimension) -> i64 {
        match dimension {
            Dimension::Users => self.usuarios,
            Dimension::WhatsappAccounts => self.whatsapps,
            Dimension::Campaigns => self.campanhas,
            Dimension::DailyMessages => self.mensagens_dia,
            Dimension::Templates => self.templates,
            Dimension::Contacts => self.contatos,
            Dimension::Lookups => self.consultas_mes,
        }
    }
}

fn pick(tenant: Option<i32>, plan: Option<i32>, fallback: i64) -> i64 {
    tenant.or(plan).map(i64::from).unwrap_or(fallback)
}

/// Resolved limits plus the timezone that anchors day/month usage windows.
#[derive(Debug, Clone)]
pub struct TenantEntitlements {
    pub limits: EffectiveLimits,
    pub timezone: String,
}

#[derive(Debug, FromRow)]
struct LimitsRow {
    timezone: Option<String>,
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

/// Load a tenant's effective entitlements by id. Returns `None` when the
/// tenant row does not exist. Used when a quota check runs without an
/// authenticated context, and for admin usage reports.
pub async fn load(
    pool: &PgPool,
    tenant_id: i64,
) -> Result<Option<TenantEntitlements>, DatabaseError> {
    let query = r#"
        SELECT
            t.timezone,
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
        FROM tenants t
        LEFT JOIN plans p ON p.id = t.plan_id
        WHERE t.id = $1
    "#;

    let row = sqlx::query_as::<_, LimitsRow>(query)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| {
        let tenant = LimitOverrides {
            usuarios: row.limite_usuarios,
            whatsapps: row.limite_whatsapps,
            campanhas: row.limite_campanhas,
            mensagens_dia: row.limite_mensagens_dia,
            templates: row.limite_templates,
            contatos: row.limite_contatos,
            consultas_mes: row.limite_consultas_mes,
        };
        let plan = LimitOverrides {
            usuarios: row.plan_limite_usuarios,
            whatsapps: row.plan_limite_whatsapps,
            campanhas: row.plan_limite_campanhas,
            mensagens_dia: row.plan_limite_mensagens_dia,
            templates: row.plan_limite_templates,
            contatos: row.plan_limite_contatos,
            consultas_mes: row.plan_limite_consultas_mes,
        };
        TenantEntitlements {
            limits: EffectiveLimits::resolve(&tenant, &plan),
            timezone: row.timezone.unwrap_or_else(|| "UTC".to_string()),
        }
    }))
}
