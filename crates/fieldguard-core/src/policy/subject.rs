//! Subject matching: which rules apply to the requesting principal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::Result;
use crate::transform::{Transform, TransformRegistry};

use super::PolicyRule;

/// Authenticated identity of the request, populated by the auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub user: String,
    /// Role attached directly by authentication, if any.
    pub role: Option<String>,
}

impl Principal {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    fn matches_exact(&self, subject: &str) -> bool {
        self.user == subject || self.role.as_deref() == Some(subject)
    }
}

/// Query side of an external role-hierarchy engine.
pub trait RoleResolver: Send + Sync {
    /// Transitive role set of `identity`. `Err` means the engine is unavailable.
    fn resolve_roles(&self, identity: &str) -> Result<HashSet<String>>;
}

/// In-process role graph built from `(member, role)` grouping edges.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleHierarchy {
    parents: HashMap<String, Vec<String>>,
}

impl StaticRoleHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<I, M, R>(edges: I) -> Self
    where
        I: IntoIterator<Item = (M, R)>,
        M: Into<String>,
        R: Into<String>,
    {
        let mut h = Self::new();
        for (member, role) in edges {
            h.add(member, role);
        }
        h
    }

    pub fn add(&mut self, member: impl Into<String>, role: impl Into<String>) {
        let role = role.into();
        let parents = self.parents.entry(member.into()).or_default();
        if !parents.contains(&role) {
            parents.push(role);
        }
    }
}

impl RoleResolver for StaticRoleHierarchy {
    fn resolve_roles(&self, identity: &str) -> Result<HashSet<String>> {
        let mut out = HashSet::new();
        let mut stack: Vec<&str> = vec![identity];
        while let Some(cur) = stack.pop() {
            let Some(parents) = self.parents.get(cur) else { continue; };
            for p in parents {
                // cycle-safe: each role is expanded once
                if p != identity && out.insert(p.clone()) {
                    stack.push(p);
                }
            }
        }
        Ok(out)
    }
}

/// A rule whose subject matched and whose transform resolved.
#[derive(Clone)]
pub struct MatchedRule {
    pub rule: PolicyRule,
    pub transform: Arc<dyn Transform>,
}

impl std::fmt::Debug for MatchedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchedRule").field("rule", &self.rule).finish_non_exhaustive()
    }
}

/// Select the rules that apply to `principal`, keeping file order.
///
/// The role engine is consulted at most once per identity (the user and any
/// direct role) and only when some rule does not match the principal directly. If it fails, matching falls back to exact
/// identity. Rules naming an unregistered transform are dropped.
pub fn resolve_matches(
    principal: &Principal,
    rules: &[PolicyRule],
    roles: Option<&dyn RoleResolver>,
    registry: &TransformRegistry,
) -> Vec<MatchedRule> {
    let mut role_set: Option<HashSet<String>> = None;
    let mut out = Vec::new();

    for rule in rules {
        if rule.subject.is_empty() {
            continue;
        }
        let matched = principal.matches_exact(&rule.subject) || {
            let set = role_set.get_or_insert_with(|| query_roles(principal, roles));
            set.contains(&rule.subject)
        };
        if !matched {
            continue;
        }

        let Some(transform) = registry.lookup(&rule.transform_name) else {
            tracing::warn!(
                transform = %rule.transform_name,
                model = %rule.model_name,
                "rule references unregistered transform; skipped"
            );
            continue;
        };

        out.push(MatchedRule {
            rule: rule.clone(),
            transform,
        });
    }

    tracing::debug!(user = %principal.user, matched = out.len(), "subject rules resolved");
    out
}

/// Roles inherited by the user and by the role authentication attached.
fn query_roles(principal: &Principal, roles: Option<&dyn RoleResolver>) -> HashSet<String> {
    let Some(engine) = roles else { return HashSet::new(); };
    let identities = std::iter::once(principal.user.as_str())
        .chain(principal.role.as_deref())
        .filter(|id| !id.is_empty());

    let mut out = HashSet::new();
    for identity in identities {
        match engine.resolve_roles(identity) {
            Ok(set) => out.extend(set),
            Err(e) => {
                tracing::warn!(identity, error = %e, "role engine unavailable; exact match only");
            }
        }
    }
    out
}
