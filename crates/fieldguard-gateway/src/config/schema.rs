use std::net::SocketAddr;

use serde::Deserialize;
use fieldguard_core::error::{FilterError, Result};
use fieldguard_core::{NamingPolicy, StaticRoleHierarchy};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    pub filter: FilterSection,

    /// Static role hierarchy (`member` inherits `role`). Empty => no role engine.
    #[serde(default)]
    pub roles: Vec<RoleEdge>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FilterError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.filter.validate()?;

        for (i, edge) in self.roles.iter().enumerate() {
            if edge.member.trim().is_empty() || edge.role.trim().is_empty() {
                return Err(FilterError::BadRequest(format!(
                    "roles[{i}]: member and role must not be empty"
                )));
            }
        }
        Ok(())
    }

    pub fn role_hierarchy(&self) -> Option<StaticRoleHierarchy> {
        if self.roles.is_empty() {
            return None;
        }
        Some(StaticRoleHierarchy::from_edges(
            self.roles.iter().map(|e| (e.member.clone(), e.role.clone())),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            FilterError::BadRequest(format!(
                "gateway.listen must be a valid SocketAddr: {}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSection {
    pub policy_path: String,
    #[serde(default)]
    pub naming: NamingPolicy,
}

impl FilterSection {
    pub fn validate(&self) -> Result<()> {
        if self.policy_path.trim().is_empty() {
            return Err(FilterError::BadRequest("filter.policy_path must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleEdge {
    pub member: String,
    pub role: String,
}
