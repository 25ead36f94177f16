//! Filter policy: rule model and the line-oriented policy file loader.
//!
//! File format (one rule per line, no header, no escaping):
//!
//! ```text
//! # subject, model, fields, transform
//! alice, User, UserMobile, mask
//! admin, User, UserSalary | UserAge, omit
//! ```
//!
//! Blank lines and `#` comments are skipped. Commas cannot appear inside a
//! value; there is no quoting.

pub mod subject;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::error::{FilterError, Result};
use crate::transform::TransformRegistry;

pub use subject::{resolve_matches, MatchedRule, Principal, RoleResolver, StaticRoleHierarchy};

const COLUMNS: usize = 4;

/// One policy line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    /// User or role the rule applies to.
    pub subject: String,
    /// Declared type name of the structured value.
    pub model_name: String,
    /// Field identifiers (deduplicated, file order kept).
    pub fields: Vec<String>,
    /// Registry key, resolved at request time.
    pub transform_name: String,
}

impl PolicyRule {
    /// Inert rules never produce overrides.
    pub fn is_inert(&self) -> bool {
        self.model_name.is_empty() || self.fields.is_empty()
    }

    fn parse(line_no: usize, line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split(',').map(str::trim).collect();
        let [subject, model_name, field_spec, transform_name] = tokens[..] else {
            return Err(FilterError::PolicyFormat {
                line: line_no,
                reason: format!("expected {COLUMNS} columns, found {}", tokens.len()),
            });
        };

        let mut fields: Vec<String> = Vec::new();
        for f in field_spec.split('|').map(str::trim) {
            if !f.is_empty() && !fields.iter().any(|x| x == f) {
                fields.push(f.to_string());
            }
        }

        Ok(Self {
            subject: subject.to_string(),
            model_name: model_name.to_string(),
            fields,
            transform_name: transform_name.to_string(),
        })
    }
}

/// Startup diagnostics for rules that will silently do nothing (or less than
/// they appear to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyWarning {
    UnregisteredTransform { index: usize, transform: String },
    InertRule { index: usize },
    /// A later rule for the same subject overrides an earlier one.
    Shadowed {
        earlier: usize,
        later: usize,
        model: String,
        field: String,
    },
    /// Rules for different subjects target the same field. A principal
    /// matching both (say, a user and one of its roles) gets the later one.
    Overlap {
        earlier: usize,
        later: usize,
        model: String,
        field: String,
    },
}

/// Immutable, ordered rule list.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    rules: Arc<[PolicyRule]>,
}

impl PolicySet {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FilterError::PolicyIo(format!("open {} failed: {e}", path.display()))
        })?;
        Self::load_from_reader(BufReader::new(f))
    }

    pub fn load_from_str(s: &str) -> Result<Self> {
        Self::load_from_reader(s.as_bytes())
    }

    pub fn load_from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut rules = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| FilterError::PolicyIo(format!("read failed: {e}")))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            rules.push(PolicyRule::parse(idx + 1, line)?);
        }
        tracing::debug!(rules = rules.len(), "filter policy loaded");
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Report rules that degrade silently at request time.
    pub fn validate(&self, registry: &TransformRegistry) -> Vec<PolicyWarning> {
        let mut out = Vec::new();
        let mut seen: HashMap<(&str, &str, &str), usize> = HashMap::new();
        let mut targeted: HashMap<(&str, &str), (usize, &str)> = HashMap::new();

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.is_inert() {
                out.push(PolicyWarning::InertRule { index });
                continue;
            }
            if !registry.contains(&rule.transform_name) {
                out.push(PolicyWarning::UnregisteredTransform {
                    index,
                    transform: rule.transform_name.clone(),
                });
            }
            for field in &rule.fields {
                let key = (rule.subject.as_str(), rule.model_name.as_str(), field.as_str());
                if let Some(earlier) = seen.insert(key, index) {
                    out.push(PolicyWarning::Shadowed {
                        earlier,
                        later: index,
                        model: rule.model_name.clone(),
                        field: field.clone(),
                    });
                }
                let target = (rule.model_name.as_str(), field.as_str());
                if let Some((earlier, subject)) = targeted.insert(target, (index, rule.subject.as_str())) {
                    if subject != rule.subject {
                        out.push(PolicyWarning::Overlap {
                            earlier,
                            later: index,
                            model: rule.model_name.clone(),
                            field: field.clone(),
                        });
                    }
                }
            }
        }
        out
    }
}
