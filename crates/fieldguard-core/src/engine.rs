//! Filter engine: the explicitly constructed, process-wide policy object, and
//! the request-scoped state derived from it.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use serde_json::Value;

use crate::encode::{self, NamingPolicy, OverrideTable};
use crate::error::Result;
use crate::policy::{resolve_matches, MatchedRule, PolicySet, PolicyWarning, Principal, RoleResolver};
use crate::transform::{Transform, TransformRegistry};

/// Rules + transforms + role engine + naming policy.
///
/// Construct once at startup, then share via Arc. Registering transforms is
/// expected before traffic starts; it stays safe afterwards.
pub struct FilterEngine {
    policy: PolicySet,
    registry: TransformRegistry,
    roles: Option<Arc<dyn RoleResolver>>,
    naming: NamingPolicy,
}

impl FilterEngine {
    pub fn new(policy: PolicySet) -> Self {
        Self {
            policy,
            registry: TransformRegistry::with_builtins(),
            roles: None,
            naming: NamingPolicy::default(),
        }
    }

    /// Load the policy file. Failure is fatal: there is no default policy.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(PolicySet::load_from_file(path)?))
    }

    pub fn with_roles(mut self, roles: Arc<dyn RoleResolver>) -> Self {
        self.roles = Some(roles);
        self
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    pub fn register_transform<T: Transform + 'static>(&self, name: impl Into<String>, transform: T) {
        self.registry.register(name, transform);
    }

    pub fn policy(&self) -> &PolicySet {
        &self.policy
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn naming(&self) -> NamingPolicy {
        self.naming
    }

    /// Log silent-failure surfaces (unknown transforms, inert or shadowed
    /// rules). Call after all transforms are registered.
    pub fn validate(&self) -> Vec<PolicyWarning> {
        let warnings = self.policy.validate(&self.registry);
        for w in &warnings {
            tracing::warn!(warning = ?w, "filter policy warning");
        }
        warnings
    }

    /// Resolve the rules for one request.
    pub fn begin(&self, principal: Principal) -> RequestFilterState {
        let matched = if self.policy.is_empty() {
            Vec::new()
        } else {
            resolve_matches(
                &principal,
                self.policy.rules(),
                self.roles.as_deref(),
                &self.registry,
            )
        };
        RequestFilterState {
            principal,
            matched,
            naming: self.naming,
            overrides: OnceLock::new(),
        }
    }
}

/// Request-scoped filter state. Never shared across requests.
#[derive(Debug)]
pub struct RequestFilterState {
    principal: Principal,
    matched: Vec<MatchedRule>,
    naming: NamingPolicy,
    overrides: OnceLock<OverrideTable>,
}

impl RequestFilterState {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn matched(&self) -> &[MatchedRule] {
        &self.matched
    }

    /// Override table, built on first use.
    pub fn overrides(&self) -> &OverrideTable {
        self.overrides.get_or_init(|| OverrideTable::build(&self.matched))
    }

    pub fn to_value<T: ?Sized + Serialize>(&self, payload: &T) -> Result<Value> {
        encode::to_filtered_value(payload, self.overrides(), self.naming)
    }

    pub fn to_vec<T: ?Sized + Serialize>(&self, payload: &T) -> Result<Vec<u8>> {
        encode::to_filtered_vec(payload, self.overrides(), self.naming)
    }
}
