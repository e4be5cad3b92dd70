use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Subscription lifecycle of a tenant. Transitions happen in the billing
/// subsystem; the gateway only reads the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Trial,
    Active,
    Suspended,
    Cancelled,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Trial => "trial",
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TenantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(TenantStatus::Trial),
            "active" => Ok(TenantStatus::Active),
            "suspended" => Ok(TenantStatus::Suspended),
            "cancelled" => Ok(TenantStatus::Cancelled),
            other => Err(format!("unknown tenant status '{}'", other)),
        }
    }
}

/// Per-resource limit columns as stored on `tenants` and `plans`.
///
/// `None` means "not set at this level"; `-1` is the unlimited sentinel.
#[derive(Debug, Clone, Default)]
pub struct LimitOverrides {
    pub usuarios: Option<i32>,
    pub whatsapps: Option<i32>,
    pub campanhas: Option<i32>,
    pub mensagens_dia: Option<i32>,
    pub templates: Option<i32>,
    pub contatos: Option<i32>,
    pub consultas_mes: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses() {
        assert_eq!("trial".parse::<TenantStatus>(), Ok(TenantStatus::Trial));
        assert_eq!("active".parse::<TenantStatus>(), Ok(TenantStatus::Active));
        assert_eq!(
            "suspended".parse::<TenantStatus>(),
            Ok(TenantStatus::Suspended)
        );
        assert_eq!(
            "cancelled".parse::<TenantStatus>(),
            Ok(TenantStatus::Cancelled)
        );
        assert!("deleted".parse::<TenantStatus>().is_err());
    }

    #[test]
    fn status_round_trips_as_str() {
        for status in [
            TenantStatus::Trial,
            TenantStatus::Active,
            TenantStatus::Suspended,
            TenantStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TenantStatus>(), Ok(status));
        }
    }
}
