//! Shared application state for the fieldguard gateway.
//!
//! The filter engine is an explicitly constructed object shared by handle;
//! nothing here is ambient global state, so tests build independent instances.

use std::sync::Arc;

use fieldguard_core::error::Result;
use fieldguard_core::FilterEngine;

use crate::config::GatewayConfig;
use crate::obs::FilterMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    engine: Arc<FilterEngine>,
    metrics: Arc<FilterMetrics>,
}

struct AppStateInner {
    cfg: GatewayConfig,
}

impl AppState {
    /// Load the policy file named by the config and build the engine.
    /// A policy that cannot be loaded aborts startup.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let mut engine = FilterEngine::from_file(&cfg.filter.policy_path)?.with_naming(cfg.filter.naming);
        if let Some(roles) = cfg.role_hierarchy() {
            engine = engine.with_roles(Arc::new(roles));
        }

        tracing::info!(
            policy = %cfg.filter.policy_path,
            rules = engine.policy().len(),
            "filter policy loaded"
        );
        Ok(Self::with_engine(cfg, engine))
    }

    pub fn with_engine(cfg: GatewayConfig, engine: FilterEngine) -> Self {
        Self {
            inner: Arc::new(AppStateInner { cfg }),
            engine: Arc::new(engine),
            metrics: Arc::new(FilterMetrics::default()),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &FilterMetrics {
        &self.metrics
    }
}
