use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Principal role within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    TenantAdmin,
    Supervisor,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::TenantAdmin => "tenant_admin",
            Role::Supervisor => "supervisor",
            Role::Agent => "agent",
        }
    }

    /// Admin roles bypass permission-string checks entirely.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::TenantAdmin)
    }

    /// Parse a stored role, degrading unknown values to the least-privileged
    /// role rather than failing the request.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!("unknown role '{}' in users table, treating as agent", value);
            Role::Agent
        })
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "tenant_admin" => Ok(Role::TenantAdmin),
            "supervisor" => Ok(Role::Supervisor),
            "agent" => Ok(Role::Agent),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_roles_bypass_permissions() {
        assert!(Role::SuperAdmin.is_admin());
        assert!(Role::TenantAdmin.is_admin());
        assert!(!Role::Supervisor.is_admin());
        assert!(!Role::Agent.is_admin());
    }

    #[test]
    fn unknown_role_degrades_to_agent() {
        assert_eq!(Role::parse_or_default("intern"), Role::Agent);
        assert_eq!(Role::parse_or_default("super_admin"), Role::SuperAdmin);
    }
}
