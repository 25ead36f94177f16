//! fieldguard core: policy rules, transforms, subject matching and the
//! override-driven serializer.
//!
//! This crate carries no transport or runtime dependencies so the same engine
//! can sit behind any HTTP stack (the gateway crate wires it into axum).
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `FilterError`/`Result` so a bad policy line or a failing custom
//! transform never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod encode;
pub mod engine;
pub mod error;
pub mod policy;
pub mod transform;

/// Shared result type.
pub use error::{Result, FilterError};

pub use encode::{NamingPolicy, OverrideTable};
pub use engine::{FilterEngine, RequestFilterState};
pub use policy::{PolicyRule, PolicySet, Principal, RoleResolver, StaticRoleHierarchy};
pub use transform::{FnTransform, Transform, TransformRegistry};
