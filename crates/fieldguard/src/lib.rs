//! Top-level facade crate for fieldguard.
//!
//! Re-exports the core engine and the axum gateway so users can depend on a
//! single crate.

pub mod core {
    pub use fieldguard_core::*;
}

pub mod gateway {
    pub use fieldguard_gateway::*;
}
